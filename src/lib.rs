//! Muninn - per-function memoization with pluggable eviction
//!
//! Muninn remembers the results of expensive function calls (client
//! construction, lookups, anything deterministic enough to reuse). Each
//! memoized function gets its own keyed cache, chosen from four eviction
//! strategies, and a [`CacheRegistry`] keeps those caches keyed by a
//! fingerprint of the function itself.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use muninn::cache::CacheSpec;
//! use muninn::{CacheRegistry, Memoize, callable};
//!
//! fn load_profile(user_id: u64) -> String {
//!     format!("profile #{user_id}")
//! }
//!
//! # fn main() -> muninn::Result<()> {
//! let registry = CacheRegistry::new();
//!
//! // Entries live while they are used, and idle out after 30 seconds.
//! let memo = Memoize::builder()
//!     .spec(CacheSpec::tti(128, Duration::from_secs(30)))
//!     .key(|user_id: &u64| *user_id)
//!     .build()?;
//!
//! let load_profile = memo.wrap(&registry, callable!(load_profile))?;
//! assert_eq!(load_profile.call(7), "profile #7");
//! assert_eq!(load_profile.cache()?.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`fingerprint`] - stable identities for callables
//! - [`cache`] - the [`KeyedCache`] trait and its LRU, TTL, variable-TTL and
//!   time-to-idle implementations
//! - [`registry`] - fingerprint to per-function cache, with a fixed horizon
//! - [`memoize`] - the wrapper that ties the three together

pub mod cache;
pub mod clock;
pub mod error;
pub mod fingerprint;
pub mod memoize;
pub mod registry;
pub mod telemetry;

// Re-export main types at crate root
pub use cache::{CacheKind, CacheSpec, CacheStats, KeyedCache, SharedCache};
pub use error::{MuninnError, Result};
pub use fingerprint::{Callable, CodeLocation, Fingerprint, FingerprintMethod};
pub use memoize::{Memoize, MemoizeBuilder, Memoized};
pub use registry::{CacheRegistry, RegistryConfig};
