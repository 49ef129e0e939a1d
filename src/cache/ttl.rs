//! Fixed time-to-live cache.

use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;

use super::list::{EntryList, Order};
use super::stats::{CacheStats, StatsCounter};
use super::{CacheKind, KeyedCache, horizon, record_evictions};
use crate::clock::{Clock, SystemClock};

/// Bounded cache where every entry lives exactly `ttl` after its last `put`.
///
/// Reads never extend an entry's life, but they do count as a use: on
/// overflow, expired entries are purged first and then the least recently
/// used live entry is evicted. [`keys()`](KeyedCache::keys) lists entries
/// soonest to expire first. A `ttl` too large to add to the current instant
/// means entries never expire.
pub struct TtlCache<K, V> {
    entries: Mutex<EntryList<K, V>>,
    capacity: usize,
    ttl: Duration,
    clock: Box<dyn Clock>,
    stats: StatsCounter,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache of at most `capacity` entries that expire `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, SystemClock)
    }

    /// Like [`new()`](Self::new) but reading time from `clock`.
    pub fn with_clock(capacity: usize, ttl: Duration, clock: impl Clock) -> Self {
        Self {
            entries: Mutex::new(EntryList::expiring(capacity)),
            capacity,
            ttl,
            clock: Box::new(clock),
            stats: StatsCounter::default(),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<K, V> KeyedCache<K, V> for TtlCache<K, V>
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
            record_evictions(&self.stats, CacheKind::Ttl, 0, 1);
            self.stats.miss();
            return None;
        }
        entries.touch(idx);
        self.stats.hit();
        Some(entries.node(idx).value.clone())
    }

    fn put(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        entries.remove(&key);
        entries.insert(key, value, horizon(now, self.ttl));
        self.stats.insert();
        let evicted = entries.shrink_to(self.capacity, Order::Recency);
        record_evictions(&self.stats, CacheKind::Ttl, evicted, expired);
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
        record_evictions(&self.stats, CacheKind::Ttl, 0, expired);
        entries.keys()
    }

    fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        record_evictions(&self.stats, CacheKind::Ttl, 0, expired);
        entries.len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Ttl
    }

    fn stats(&self) -> CacheStats {
        let size = self.entries.lock().len();
        self.stats.snapshot(size, self.capacity)
    }
}
