//! Declarative cache selection.
//!
//! [`CacheSpec`] names an eviction strategy plus its sizing, and builds a
//! ready [`SharedCache`]. It deserialises from a host application's own
//! configuration, e.g. TOML:
//!
//! ```toml
//! kind = "tti"
//! capacity = 64
//! ttl_secs = 30.0
//! ```
//!
//! Time-based kinds built from a spec use the fixed `ttl` as their
//! time-to-use rule (`now + ttl`). A `ttl` too large to add to the current
//! instant means entries never expire. Callers that need a computed horizon
//! construct [`VariableTtlCache`] or [`TtiCache`] directly.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::{CacheKind, LruCache, SharedCache, TtiCache, TtlCache, VariableTtlCache};
use crate::{MuninnError, Result};

/// Default entry limit for a spec that doesn't set one.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Strategy and sizing for one per-function cache.
///
/// ```rust
/// # use muninn::cache::{CacheKind, CacheSpec};
/// # use std::time::Duration;
/// let spec = CacheSpec::tti(64, Duration::from_secs(30));
/// assert_eq!(spec.kind, CacheKind::Tti);
///
/// let cache = spec.build::<String, u64>().unwrap();
/// assert_eq!(cache.capacity(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheSpec {
    /// Eviction strategy.
    pub kind: CacheKind,
    /// Maximum number of entries. Default: 1,024.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Base time-to-live; required for every kind except `lru`.
    #[serde(
        default,
        rename = "ttl_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub ttl: Option<Duration>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs: Option<f64> = Option::deserialize(deserializer)?;
    secs.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom))
        .transpose()
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self::lru(DEFAULT_CAPACITY)
    }
}

impl CacheSpec {
    /// Size-bounded LRU.
    pub fn lru(capacity: usize) -> Self {
        Self {
            kind: CacheKind::Lru,
            capacity,
            ttl: None,
        }
    }

    /// Fixed time-to-live.
    pub fn ttl(capacity: usize, ttl: Duration) -> Self {
        Self {
            kind: CacheKind::Ttl,
            capacity,
            ttl: Some(ttl),
        }
    }

    /// Per-entry time-to-live; every entry gets `now + ttl` at insertion.
    pub fn variable_ttl(capacity: usize, ttl: Duration) -> Self {
        Self {
            kind: CacheKind::VariableTtl,
            capacity,
            ttl: Some(ttl),
        }
    }

    /// Time-to-idle; every read extends the entry to `now + ttl`.
    pub fn tti(capacity: usize, ttl: Duration) -> Self {
        Self {
            kind: CacheKind::Tti,
            capacity,
            ttl: Some(ttl),
        }
    }

    /// Set the maximum number of entries.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check that the spec describes a usable cache.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(MuninnError::config(format!(
                "{} cache capacity must be positive",
                self.kind
            )));
        }
        if self.kind.is_time_based() {
            match self.ttl {
                None => {
                    return Err(MuninnError::config(format!(
                        "{} cache requires ttl_secs",
                        self.kind
                    )));
                }
                Some(ttl) if ttl.is_zero() => {
                    return Err(MuninnError::config(format!(
                        "{} cache ttl must be positive",
                        self.kind
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Build the cache this spec describes.
    pub fn build<K, V>(&self) -> Result<SharedCache<K, V>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        self.validate()?;
        let capacity = self.capacity;
        let ttl = self.ttl.unwrap_or_default();
        let cache: SharedCache<K, V> = match self.kind {
            CacheKind::Lru => Arc::new(LruCache::new(capacity)),
            CacheKind::Ttl => Arc::new(TtlCache::new(capacity, ttl)),
            CacheKind::VariableTtl => Arc::new(VariableTtlCache::uniform(capacity, ttl)),
            CacheKind::Tti => Arc::new(TtiCache::idle(capacity, ttl)),
        };
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_lru() {
        let spec = CacheSpec::default();
        assert_eq!(spec.kind, CacheKind::Lru);
        assert_eq!(spec.capacity, DEFAULT_CAPACITY);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = CacheSpec::lru(0).validate().unwrap_err();
        assert!(err.to_string().contains("capacity must be positive"));
    }

    #[test]
    fn time_based_kind_needs_ttl() {
        let spec = CacheSpec {
            kind: CacheKind::Tti,
            capacity: 8,
            ttl: None,
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("requires ttl_secs"));
    }

    #[test]
    fn zero_ttl_rejected() {
        let err = CacheSpec::ttl(8, Duration::ZERO).validate().unwrap_err();
        assert!(err.to_string().contains("ttl must be positive"));
    }

    #[test]
    fn build_matches_kind() {
        let minute = Duration::from_secs(60);
        for spec in [
            CacheSpec::lru(4),
            CacheSpec::ttl(4, minute),
            CacheSpec::variable_ttl(4, minute),
            CacheSpec::tti(4, minute),
        ] {
            let cache = spec.build::<u32, u32>().unwrap();
            assert_eq!(cache.kind(), spec.kind);
            assert_eq!(cache.capacity(), 4);
        }
    }

    #[test]
    fn huge_ttl_builds_caches_that_never_expire() {
        for spec in [
            CacheSpec::ttl(4, Duration::MAX),
            CacheSpec::variable_ttl(4, Duration::MAX),
            CacheSpec::tti(4, Duration::MAX),
        ] {
            let cache = spec.build::<u32, u32>().unwrap();
            cache.put(1, 1);
            cache.put(2, 2);
            assert_eq!(cache.get(&1), Some(1), "{}", spec.kind);
            assert_eq!(cache.len(), 2);
        }
    }

    #[test]
    fn capacity_setter_overrides() {
        let spec = CacheSpec::tti(4, Duration::from_secs(1)).capacity(32);
        assert_eq!(spec.capacity, 32);
    }
}
