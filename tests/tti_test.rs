//! Tests for [`TtiCache`] sliding expiration.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use muninn::cache::{KeyedCache, TtiCache};
use muninn::clock::ManualClock;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn tti(capacity: usize, window: Duration, clock: &ManualClock) -> TtiCache<&'static str, i32> {
    TtiCache::with_clock(
        capacity,
        window,
        move |_: &&str, _: &i32, now| now + window,
        clock.clone(),
    )
}

// =========================================================================
// Ordering
// =========================================================================

#[test]
fn read_reorders_then_untouched_entry_expires() {
    let clock = ManualClock::new();
    let cache = tti(5, secs(2), &clock);

    cache.put("a", 1);
    cache.put("b", 2);
    assert_eq!(cache.keys(), vec!["a", "b"]);

    clock.advance(secs(1));
    assert_eq!(cache.get(&"a"), Some(1));
    assert_eq!(cache.keys(), vec!["b", "a"]);

    clock.advance(secs(1));
    assert_eq!(cache.keys(), vec!["a"]);
    assert!(!cache.contains(&"b"));
    assert_eq!(cache.get(&"a"), Some(1));
}

#[test]
fn read_reorders_with_real_clock() {
    let cache = TtiCache::new(5, secs(2), |_: &&str, _: &i32, now| now + secs(2));

    cache.put("a", 1);
    cache.put("b", 2);
    assert_eq!(cache.keys(), vec!["a", "b"]);

    thread::sleep(secs(1));
    assert_eq!(cache.get(&"a"), Some(1));
    assert_eq!(cache.keys(), vec!["b", "a"]);

    thread::sleep(secs(1));
    assert_eq!(cache.keys(), vec!["a"]);
}

#[test]
fn ttu_earlier_than_other_entries_sorts_in_place() {
    let clock = ManualClock::new();
    let cache = TtiCache::with_clock(
        5,
        secs(10),
        |key: &&str, _: &i32, now| {
            if *key == "short" { now + secs(1) } else { now + secs(10) }
        },
        clock.clone(),
    );
    cache.put("short", 1);
    cache.put("long", 2);
    assert_eq!(cache.keys(), vec!["short", "long"]);

    // Refreshing "short" gives it a horizon ahead of "long", so it stays at the head.
    cache.get(&"short");
    assert_eq!(cache.keys(), vec!["short", "long"]);

    clock.advance(secs(1));
    assert_eq!(cache.keys(), vec!["long"]);
}

// =========================================================================
// Expiry
// =========================================================================

#[test]
fn continuous_use_outlives_base_ttl() {
    let clock = ManualClock::new();
    let cache = tti(5, secs(2), &clock);
    cache.put("hot", 1);

    for _ in 0..10 {
        clock.advance(Duration::from_millis(1500));
        assert_eq!(cache.get(&"hot"), Some(1));
    }
    assert!(cache.contains(&"hot"));
}

#[test]
fn contains_does_not_refresh() {
    let clock = ManualClock::new();
    let cache = tti(5, secs(2), &clock);
    cache.put("a", 1);

    clock.advance(Duration::from_millis(1500));
    assert!(cache.contains(&"a"));
    clock.advance(Duration::from_millis(500));
    assert!(!cache.contains(&"a"));
    assert_eq!(cache.get(&"a"), None);
}

#[test]
fn expired_entry_read_is_a_miss_and_is_removed() {
    let clock = ManualClock::new();
    let cache = tti(5, secs(2), &clock);
    cache.put("a", 1);
    cache.put("b", 2);

    clock.advance(secs(3));
    assert_eq!(cache.get(&"a"), None);

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.expirations, 1);
    // "b" is expired too but only purged by the next sweep.
    assert_eq!(stats.size, 1);
    assert!(cache.is_empty());
}

#[test]
fn put_resets_horizon_to_base_ttl() {
    let clock = ManualClock::new();
    let cache = tti(5, secs(2), &clock);
    cache.put("a", 1);
    clock.advance(Duration::from_millis(1500));
    cache.put("a", 2);
    clock.advance(Duration::from_millis(1500));

    assert_eq!(cache.get(&"a"), Some(2));
}

#[test]
fn remove_returns_value() {
    let clock = ManualClock::new();
    let cache = tti(5, secs(2), &clock);
    cache.put("a", 1);
    assert_eq!(cache.remove(&"a"), Some(1));
    assert_eq!(cache.remove(&"a"), None);
}

// =========================================================================
// Capacity
// =========================================================================

#[test]
fn overflow_evicts_head() {
    let clock = ManualClock::new();
    let cache = tti(3, secs(10), &clock);
    for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
        cache.put(key, i as i32);
        clock.advance(secs(1));
    }
    cache.get(&"a");
    cache.put("d", 3);

    assert_eq!(cache.keys(), vec!["c", "a", "d"]);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn expired_entries_make_room_before_eviction() {
    let clock = ManualClock::new();
    let cache = tti(2, secs(2), &clock);
    cache.put("a", 1);
    cache.put("b", 2);
    clock.advance(secs(2));
    cache.put("c", 3);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 0);
    assert_eq!(stats.expirations, 2);
    assert_eq!(cache.keys(), vec!["c"]);
}

// =========================================================================
// Concurrency
// =========================================================================

#[test]
fn concurrent_readers_and_writers_keep_bounds() {
    let cache: Arc<TtiCache<u32, u32>> = Arc::new(TtiCache::idle(16, secs(60)));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500u32 {
                    let key = (i * 7 + t) % 40;
                    if i % 3 == 0 {
                        cache.put(key, key * 2);
                    } else if let Some(value) = cache.get(&key) {
                        assert_eq!(value, key * 2);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let keys = cache.keys();
    assert!(keys.len() <= 16);
    for key in keys {
        assert!(cache.contains(&key));
    }
}
