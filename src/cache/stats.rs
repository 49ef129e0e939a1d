//! Per-cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics for one keyed cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held (expired entries not yet purged included).
    pub size: usize,
    /// Configured entry limit.
    pub capacity: usize,
    /// `get` calls that returned a value.
    pub hits: u64,
    /// `get` calls that found nothing or an expired entry.
    pub misses: u64,
    /// Successful `put` calls.
    pub inserts: u64,
    /// Entries pushed out to respect `capacity`.
    pub evictions: u64,
    /// Entries dropped because their horizon passed.
    pub expirations: u64,
}

impl CacheStats {
    /// Fraction of `get` calls that hit, in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters updated by the cache variants.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn evicted(&self, n: usize) {
        self.evictions.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self, n: usize) {
        self.expirations.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize, capacity: usize) -> CacheStats {
        CacheStats {
            size,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}
