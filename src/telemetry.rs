//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind`: cache variant (`"lru"`, `"ttl"`, `"tlru"`, `"tti"`)
//! - `cause`: why an entry left a cache

/// Memoized calls answered from the per-function cache.
///
/// Labels: `kind`.
pub const MEMO_HITS_TOTAL: &str = "muninn_memo_hits_total";

/// Memoized calls that had to run the wrapped function.
///
/// Labels: `kind`.
pub const MEMO_MISSES_TOTAL: &str = "muninn_memo_misses_total";

/// Entries removed from a keyed cache without an explicit `remove`.
///
/// Labels: `kind`, `cause` ("capacity" | "expired").
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";

/// Per-function caches created by the registry.
///
/// Labels: `kind`.
pub const REGISTRY_CACHES_CREATED_TOTAL: &str = "muninn_registry_caches_created_total";

/// Per-function caches discarded by the registry, live entries included.
///
/// Labels: `cause` ("expired" | "size" | "explicit" | "replaced").
pub const REGISTRY_CACHES_DROPPED_TOTAL: &str = "muninn_registry_caches_dropped_total";
