//! Cache registry: the cache of per-function caches.
//!
//! [`CacheRegistry`] maps a callable's [`Fingerprint`] to the keyed cache
//! that memoizes it. The cache is created by the caller's factory on first
//! use and is owned by the registry from then on: when a registry entry
//! goes, the whole per-function cache goes with it.
//!
//! # Retention
//!
//! Entries expire a fixed horizon after creation (default: 6 hours). Reads
//! do not extend that horizon, so a function that is still being called
//! loses its cached values once the horizon passes and starts over with a
//! fresh cache. The registry is also size-bounded (default: 1,024
//! functions).
//!
//! # Architecture
//!
//! - Moka-backed cache keyed on [`Fingerprint`], with a per-entry
//!   [`Expiry`] fixing each horizon at creation time.
//! - Values are type-erased and downcast to [`SharedCache<K, V>`] on lookup.
//! - Creation goes through moka's `try_get_with`: concurrent first uses of
//!   one fingerprint build a single cache, and a failing factory leaves
//!   nothing behind.
//!
//! There is no process-global instance. Build one registry at the
//! composition root and hand clones of it to whatever creates memoized
//! functions; clones share the same storage.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use tracing::{debug, instrument};

use crate::cache::{CacheKind, SharedCache};
use crate::fingerprint::Fingerprint;
use crate::telemetry;
use crate::{MuninnError, Result};

/// Default number of per-function caches the registry keeps.
pub const DEFAULT_REGISTRY_CAPACITY: u64 = 1_024;

/// Default lifetime of a per-function cache, counted from its creation.
pub const DEFAULT_REGISTRY_HORIZON: Duration = Duration::from_secs(6 * 3600);

/// Configuration for the cache registry.
///
/// ```rust
/// # use muninn::RegistryConfig;
/// # use std::time::Duration;
/// let config = RegistryConfig::new()
///     .max_entries(256)
///     .horizon(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of per-function caches. Default: 1,024.
    pub max_entries: u64,
    /// How long a per-function cache lives after creation. Default: 6 hours.
    pub horizon: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_REGISTRY_CAPACITY,
            horizon: DEFAULT_REGISTRY_HORIZON,
        }
    }
}

impl RegistryConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of per-function caches.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the lifetime of a per-function cache.
    pub fn horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }
}

/// A per-function cache with its key/value types erased.
#[derive(Clone)]
struct RegisteredCache {
    kind: CacheKind,
    cache: Arc<dyn Any + Send + Sync>,
}

/// Fixes each entry's horizon at creation; reads and updates keep it.
struct FixedHorizon(Duration);

impl Expiry<Fingerprint, RegisteredCache> for FixedHorizon {
    fn expire_after_create(
        &self,
        _fingerprint: &Fingerprint,
        _cache: &RegisteredCache,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.0)
    }
}

/// Process-lifetime map from callable fingerprint to its keyed cache.
#[derive(Clone)]
pub struct CacheRegistry {
    caches: Cache<Fingerprint, RegisteredCache>,
}

impl CacheRegistry {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Create a registry from the given configuration.
    pub fn with_config(config: &RegistryConfig) -> Self {
        let caches = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(FixedHorizon(config.horizon))
            .eviction_listener(on_dropped)
            .build();
        Self { caches }
    }

    /// Return the cache registered for `fingerprint`, creating it with
    /// `factory` if there is none.
    ///
    /// A factory error is returned as [`MuninnError::CacheFactory`] and
    /// nothing is registered. Asking for a fingerprint whose cache holds
    /// other key/value types yields [`MuninnError::CacheTypeMismatch`].
    #[instrument(skip_all, fields(fingerprint = %fingerprint))]
    pub fn get_or_create<K, V, F>(
        &self,
        fingerprint: &Fingerprint,
        factory: F,
    ) -> Result<SharedCache<K, V>>
    where
        K: 'static,
        V: 'static,
        F: FnOnce() -> Result<SharedCache<K, V>>,
    {
        let entry = self
            .caches
            .try_get_with(*fingerprint, || {
                let cache = factory()?;
                let kind = cache.kind();
                debug!(%kind, capacity = cache.capacity(), "created per-function cache");
                metrics::counter!(
                    telemetry::REGISTRY_CACHES_CREATED_TOTAL,
                    "kind" => kind.as_str()
                )
                .increment(1);
                Ok::<_, MuninnError>(RegisteredCache {
                    kind,
                    cache: Arc::new(cache),
                })
            })
            .map_err(MuninnError::CacheFactory)?;
        downcast(fingerprint, &entry)
    }

    /// Look up a registered cache without creating one.
    ///
    /// Returns `None` if nothing is registered or the registered cache
    /// holds other key/value types.
    pub fn get<K, V>(&self, fingerprint: &Fingerprint) -> Option<SharedCache<K, V>>
    where
        K: 'static,
        V: 'static,
    {
        let entry = self.caches.get(fingerprint)?;
        downcast(fingerprint, &entry).ok()
    }

    /// Whether a live cache is registered for `fingerprint`.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.caches.contains_key(fingerprint)
    }

    /// Strategy of the cache registered for `fingerprint`.
    pub fn kind_of(&self, fingerprint: &Fingerprint) -> Option<CacheKind> {
        self.caches.get(fingerprint).map(|entry| entry.kind)
    }

    /// Discard the cache registered for `fingerprint`, entries included.
    pub fn remove(&self, fingerprint: &Fingerprint) {
        self.caches.invalidate(fingerprint);
    }

    /// Fingerprints with a live cache. Order is not guaranteed.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.caches.iter().map(|(fingerprint, _)| *fingerprint).collect()
    }

    /// Number of registered caches.
    pub fn len(&self) -> u64 {
        self.caches.run_pending_tasks();
        self.caches.entry_count()
    }

    /// Whether no caches are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every registered cache.
    pub fn clear(&self) {
        self.caches.invalidate_all();
        self.caches.run_pending_tasks();
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<K, V>(fingerprint: &Fingerprint, entry: &RegisteredCache) -> Result<SharedCache<K, V>>
where
    K: 'static,
    V: 'static,
{
    entry
        .cache
        .downcast_ref::<SharedCache<K, V>>()
        .cloned()
        .ok_or_else(|| MuninnError::CacheTypeMismatch {
            fingerprint: fingerprint.to_string(),
        })
}

fn on_dropped(fingerprint: Arc<Fingerprint>, entry: RegisteredCache, cause: RemovalCause) {
    let cause = match cause {
        RemovalCause::Expired => "expired",
        RemovalCause::Size => "size",
        RemovalCause::Explicit => "explicit",
        RemovalCause::Replaced => "replaced",
    };
    debug!(fingerprint = %fingerprint, kind = %entry.kind, cause, "dropped per-function cache");
    metrics::counter!(telemetry::REGISTRY_CACHES_DROPPED_TOTAL, "cause" => cause).increment(1);
}
