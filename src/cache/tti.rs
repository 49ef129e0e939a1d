//! Sliding-expiration (time-to-idle) cache.
//!
//! An entry survives for as long as it keeps being read. `put` gives a new
//! entry the base horizon `now + ttl`; every successful `get` asks the
//! time-to-use function for a fresh horizon, `ttu(key, value, now)`, and
//! relocates the entry accordingly.
//!
//! # Ordering
//!
//! Entries are threaded in ascending expiry, so the head is always the
//! next entry to expire and purging never scans. A refreshed entry normally
//! lands at the tail; a `ttu` that returns an earlier horizon than some
//! later entries places it at its sorted position instead, so the order
//! holds for any `ttu`.
//!
//! The map lookup, horizon update and relocation happen under one lock, so
//! concurrent readers never observe an entry detached from the ordering.
//! `ttu` runs under that lock and must not call back into the same cache.
//!
//! ```rust
//! use std::time::Duration;
//! use muninn::cache::{KeyedCache, TtiCache};
//! use muninn::clock::ManualClock;
//!
//! let clock = ManualClock::new();
//! let cache = TtiCache::with_clock(
//!     5,
//!     Duration::from_secs(2),
//!     |_key: &&str, _value: &i32, now| now + Duration::from_secs(2),
//!     clock.clone(),
//! );
//!
//! cache.put("a", 1);
//! cache.put("b", 2);
//! clock.advance(Duration::from_secs(1));
//! assert_eq!(cache.get(&"a"), Some(1));
//! assert_eq!(cache.keys(), vec!["b", "a"]);
//!
//! clock.advance(Duration::from_secs(1));
//! assert_eq!(cache.keys(), vec!["a"]);
//! ```

use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::list::{EntryList, Order};
use super::stats::{CacheStats, StatsCounter};
use super::{CacheKind, KeyedCache, TtuFn, horizon, record_evictions};
use crate::clock::{Clock, SystemClock};

/// Bounded cache whose entries expire only after a period without reads.
pub struct TtiCache<K, V> {
    entries: Mutex<EntryList<K, V>>,
    capacity: usize,
    ttl: Duration,
    ttu: TtuFn<K, V>,
    clock: Box<dyn Clock>,
    stats: StatsCounter,
}

impl<K, V> TtiCache<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    /// Create a cache of at most `capacity` entries.
    ///
    /// `ttl` is the horizon given at insertion; `ttu` computes the new
    /// absolute expiration on every successful read.
    pub fn new<F>(capacity: usize, ttl: Duration, ttu: F) -> Self
    where
        F: Fn(&K, &V, Instant) -> Instant + Send + Sync + 'static,
    {
        Self::with_clock(capacity, ttl, ttu, SystemClock)
    }

    /// A cache whose reads extend every entry by the same `idle` window.
    ///
    /// An `idle` window too large to add to the current instant, such as
    /// `Duration::MAX`, means entries never expire.
    pub fn idle(capacity: usize, idle: Duration) -> Self {
        let ttu = move |_: &K, _: &V, now: Instant| horizon(now, idle);
        Self::from_parts(capacity, idle, Box::new(ttu), SystemClock)
    }

    /// Like [`new()`](Self::new) but reading time from `clock`.
    pub fn with_clock<F>(capacity: usize, ttl: Duration, ttu: F, clock: impl Clock) -> Self
    where
        F: Fn(&K, &V, Instant) -> Instant + Send + Sync + 'static,
    {
        let ttu = move |k: &K, v: &V, now: Instant| Some(ttu(k, v, now));
        Self::from_parts(capacity, ttl, Box::new(ttu), clock)
    }

    fn from_parts(capacity: usize, ttl: Duration, ttu: TtuFn<K, V>, clock: impl Clock) -> Self {
        Self {
            entries: Mutex::new(EntryList::expiring(capacity)),
            capacity,
            ttl,
            ttu,
            clock: Box::new(clock),
            stats: StatsCounter::default(),
        }
    }

    /// The horizon given to freshly inserted entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remaining lifetime of a live entry, without refreshing it.
    /// `Duration::MAX` for an entry that never expires.
    pub fn time_to_idle(&self, key: &K) -> Option<Duration> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        let node = entries.node(entries.find(key)?);
        match node.expires_at {
            None => Some(Duration::MAX),
            Some(at) => (at > now).then(|| at.duration_since(now)),
        }
    }
}

impl<K, V> KeyedCache<K, V> for TtiCache<K, V>
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
            record_evictions(&self.stats, CacheKind::Tti, 0, 1);
            self.stats.miss();
            return None;
        }

        let node = entries.node(idx);
        let expires_at = (self.ttu)(&node.key, &node.value, now);
        let value = node.value.clone();
        entries.set_expiry(idx, expires_at);
        self.stats.hit();
        Some(value)
    }

    fn put(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        entries.remove(&key);
        entries.insert(key, value, horizon(now, self.ttl));
        self.stats.insert();
        let evicted = entries.shrink_to(self.capacity, Order::Expiry);
        // A zero ttl makes the new entry the first to go.
        let expired = expired + entries.purge_expired(now);
        record_evictions(&self.stats, CacheKind::Tti, evicted, expired);
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
        record_evictions(&self.stats, CacheKind::Tti, 0, expired);
        entries.keys()
    }

    fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = entries.purge_expired(now);
        record_evictions(&self.stats, CacheKind::Tti, 0, expired);
        entries.len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Tti
    }

    fn stats(&self) -> CacheStats {
        let size = self.entries.lock().len();
        self.stats.snapshot(size, self.capacity)
    }
}
