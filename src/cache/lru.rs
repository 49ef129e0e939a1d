//! Size-bounded least-recently-used cache.

use std::hash::Hash;

use parking_lot::Mutex;

use super::list::{EntryList, Order};
use super::stats::{CacheStats, StatsCounter};
use super::{CacheKind, KeyedCache, record_evictions};

/// Bounded cache that evicts the least recently used entry on overflow.
///
/// No time-based expiration. `get` and `put` both count as a use;
/// `contains` does not. [`keys()`](KeyedCache::keys) lists entries from
/// least to most recently used.
///
/// ```rust
/// use muninn::cache::{KeyedCache, LruCache};
///
/// let cache = LruCache::new(2);
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.get(&"a");
/// cache.put("c", 3);
/// assert_eq!(cache.keys(), vec!["a", "c"]);
/// ```
pub struct LruCache<K, V> {
    entries: Mutex<EntryList<K, V>>,
    capacity: usize,
    stats: StatsCounter,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(EntryList::with_capacity(capacity)),
            capacity,
            stats: StatsCounter::default(),
        }
    }
}

impl<K, V> KeyedCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let Some(idx) = entries.find(key) else {
            self.stats.miss();
            return None;
        };
        entries.touch(idx);
        self.stats.hit();
        Some(entries.node(idx).value.clone())
    }

    fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock();
        match entries.find(&key) {
            Some(idx) => {
                entries.node_mut(idx).value = value;
                entries.touch(idx);
            }
            None => {
                entries.insert(key, value, None);
            }
        }
        self.stats.insert();
        let evicted = entries.shrink_to(self.capacity, Order::Recency);
        record_evictions(&self.stats, CacheKind::Lru, evicted, 0);
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.lock().find(key).is_some()
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().remove(key)
    }

    fn keys(&self) -> Vec<K> {
        self.entries.lock().keys()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Lru
    }

    fn stats(&self) -> CacheStats {
        let size = self.entries.lock().len();
        self.stats.snapshot(size, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_counts_as_use() {
        let cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);
        cache.put("c", 3);

        assert_eq!(cache.get(&"a"), Some(10));
        assert!(!cache.contains(&"b"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = LruCache::new(0);
        cache.put("a", 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }
}
