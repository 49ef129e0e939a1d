//! Keyed caches.
//!
//! Four interchangeable eviction strategies behind one [`KeyedCache`] trait:
//!
//! - [`LruCache`]: size-bounded least-recently-used, no time-based expiry.
//! - [`TtlCache`]: every entry expires a fixed `ttl` after insertion.
//! - [`VariableTtlCache`]: each entry's horizon is computed once, at
//!   insertion, by a caller-supplied `ttu(key, value, now)`.
//! - [`TtiCache`]: time-to-idle: every successful read recomputes the
//!   horizon, so an entry lives as long as it keeps being used.
//!
//! All four keep their entries in one crate-owned ordered list (see
//! `list.rs`), and all of them treat an expired-but-unpurged entry as a
//! miss and drop it on contact. On overflow, [`LruCache`], [`TtlCache`]
//! and [`VariableTtlCache`] evict the least recently used live entry;
//! [`TtiCache`] evicts the entry closest to expiring.
//!
//! A time-to-live too large to add to the current instant means the entry
//! never expires.
//!
//! The memoization layer talks to caches only through [`SharedCache`], so
//! callers may plug in their own [`KeyedCache`] implementations too.

pub mod config;
mod list;
pub mod lru;
pub mod stats;
pub mod tlru;
pub mod ttl;
pub mod tti;

pub use config::{CacheSpec, DEFAULT_CAPACITY};
pub use lru::LruCache;
pub use stats::CacheStats;
pub use tlru::VariableTtlCache;
pub use ttl::TtlCache;
pub use tti::TtiCache;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::telemetry;
use stats::StatsCounter;

/// A cache shared between a memoized function and the registry.
pub type SharedCache<K, V> = Arc<dyn KeyedCache<K, V>>;

/// Time-to-use function: `(key, value, now) -> absolute expiration`, where
/// `None` means the entry never expires.
pub(crate) type TtuFn<K, V> = Box<dyn Fn(&K, &V, Instant) -> Option<Instant> + Send + Sync>;

/// `now + ttl`, or `None` when that lies beyond what [`Instant`] can hold.
pub(crate) fn horizon(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

/// Uniform contract over every eviction strategy.
///
/// Implementations are internally synchronised: every method takes
/// `&self`, and each call is applied atomically with respect to the
/// others on the same cache.
pub trait KeyedCache<K, V>: Send + Sync {
    /// Look up a live entry. Expired entries are removed and reported as a miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or replace the entry for `key`, evicting as needed.
    fn put(&self, key: K, value: V);

    /// Whether a live entry exists. Never refreshes recency or expiry.
    fn contains(&self, key: &K) -> bool;

    /// Remove an entry, returning its value even if it had expired.
    fn remove(&self, key: &K) -> Option<V>;

    /// Live keys: least recently used first for [`LruCache`], soonest to
    /// expire first for the time-based kinds.
    fn keys(&self) -> Vec<K>;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Whether there are no live entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    fn clear(&self);

    /// Maximum number of entries retained.
    fn capacity(&self) -> usize;

    /// Which eviction strategy this cache implements.
    fn kind(&self) -> CacheKind;

    /// Counters and current size.
    fn stats(&self) -> CacheStats;
}

/// Eviction strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// Size-bounded least-recently-used.
    Lru,
    /// Fixed time-to-live.
    Ttl,
    /// Per-entry time-to-live computed at insertion.
    #[serde(alias = "tlru")]
    VariableTtl,
    /// Time-to-idle (sliding expiration).
    Tti,
}

impl CacheKind {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Lru => "lru",
            CacheKind::Ttl => "ttl",
            CacheKind::VariableTtl => "tlru",
            CacheKind::Tti => "tti",
        }
    }

    /// Whether entries of this kind expire with time.
    pub fn is_time_based(&self) -> bool {
        !matches!(self, CacheKind::Lru)
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account for entries that left a cache without an explicit `remove`.
pub(crate) fn record_evictions(
    stats: &StatsCounter,
    kind: CacheKind,
    capacity: usize,
    expired: usize,
) {
    if capacity > 0 {
        stats.evicted(capacity);
        metrics::counter!(
            telemetry::CACHE_EVICTIONS_TOTAL,
            "kind" => kind.as_str(),
            "cause" => "capacity"
        )
        .increment(capacity as u64);
    }
    if expired > 0 {
        stats.expired(expired);
        metrics::counter!(
            telemetry::CACHE_EVICTIONS_TOTAL,
            "kind" => kind.as_str(),
            "cause" => "expired"
        )
        .increment(expired as u64);
    }
}
