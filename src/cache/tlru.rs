//! Variable time-to-live cache: each entry's horizon is computed once at insertion.

use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::list::{EntryList, Order};
use super::stats::{CacheStats, StatsCounter};
use super::{CacheKind, KeyedCache, TtuFn, horizon, record_evictions};
use crate::clock::{Clock, SystemClock};

/// Bounded cache with a per-entry expiration computed by `ttu(key, value, now)`.
///
/// The horizon is fixed at `put` time and never recomputed on access.
/// A `put` whose horizon is not later than now stores nothing and drops
/// any previous entry for that key. Reads count as a use, and overflow
/// evicts the least recently used live entry.
///
/// ```rust
/// use std::time::Duration;
/// use muninn::cache::{KeyedCache, VariableTtlCache};
///
/// // Short-lived entries for keys starting with "tmp:".
/// let cache = VariableTtlCache::new(100, |key: &String, _value: &u32, now| {
///     if key.starts_with("tmp:") {
///         now + Duration::from_secs(5)
///     } else {
///         now + Duration::from_secs(3600)
///     }
/// });
/// cache.put("tmp:a".to_string(), 1);
/// cache.put("b".to_string(), 2);
/// assert_eq!(cache.keys(), vec!["tmp:a".to_string(), "b".to_string()]);
/// ```
pub struct VariableTtlCache<K, V> {
    entries: Mutex<EntryList<K, V>>,
    capacity: usize,
    ttu: TtuFn<K, V>,
    clock: Box<dyn Clock>,
    stats: StatsCounter,
}

impl<K, V> VariableTtlCache<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    /// Create a cache of at most `capacity` entries with horizons from `ttu`.
    pub fn new<F>(capacity: usize, ttu: F) -> Self
    where
        F: Fn(&K, &V, Instant) -> Instant + Send + Sync + 'static,
    {
        Self::with_clock(capacity, ttu, SystemClock)
    }

    /// Like [`new()`](Self::new) but reading time from `clock`.
    pub fn with_clock<F>(capacity: usize, ttu: F, clock: impl Clock) -> Self
    where
        F: Fn(&K, &V, Instant) -> Instant + Send + Sync + 'static,
    {
        let ttu = move |k: &K, v: &V, now: Instant| Some(ttu(k, v, now));
        Self::from_parts(capacity, Box::new(ttu), clock)
    }

    /// Every entry gets the same `ttl` at insertion. A `ttl` too large to
    /// add to the current instant means entries never expire.
    pub fn uniform(capacity: usize, ttl: Duration) -> Self {
        let ttu = move |_: &K, _: &V, now: Instant| horizon(now, ttl);
        Self::from_parts(capacity, Box::new(ttu), SystemClock)
    }

    fn from_parts(capacity: usize, ttu: TtuFn<K, V>, clock: impl Clock) -> Self {
        Self {
            entries: Mutex::new(EntryList::expiring(capacity)),
            capacity,
            ttu,
            clock: Box::new(clock),
            stats: StatsCounter::default(),
        }
    }
}

impl<K, V> KeyedCache<K, V> for VariableTtlCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let Some(idx) = entries.find(key) else {
            self.stats.miss();
            return None;
        };
        if entries.node(idx).is_expired(now) {
            entries.remove_at(idx);
            record_evictions(&self.stats, CacheKind::VariableTtl, 0, 1);
            self.stats.miss();
            return None;
        }
        entries.touch(idx);
        self.stats.hit();
        Some(entries.node(idx).value.clone())
    }

    fn put(&self, key: K, value: V) {
        let now = self.clock.now();
        let expires_at = (self.ttu)(&key, &value, now);
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        entries.remove(&key);
        if expires_at.is_some_and(|at| at <= now) {
            record_evictions(&self.stats, CacheKind::VariableTtl, 0, expired);
            return;
        }
        entries.insert(key, value, expires_at);
        self.stats.insert();
        let evicted = entries.shrink_to(self.capacity, Order::Recency);
        record_evictions(&self.stats, CacheKind::VariableTtl, evicted, expired);
    }

    fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        let entries = self.entries.lock();
        entries
            .find(key)
            .is_some_and(|idx| !entries.node(idx).is_expired(now))
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().remove(key)
    }

    fn keys(&self) -> Vec<K> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        record_evictions(&self.stats, CacheKind::VariableTtl, 0, expired);
        entries.keys()
    }

    fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        record_evictions(&self.stats, CacheKind::VariableTtl, 0, expired);
        entries.len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn kind(&self) -> CacheKind {
        CacheKind::VariableTtl
    }

    fn stats(&self) -> CacheStats {
        let size = self.entries.lock().len();
        self.stats.snapshot(size, self.capacity)
    }
}
