//! Memoizing wrapper for functions.
//!
//! [`Memoize`] holds the configuration, namely a cache factory and a key
//! function, and [`Memoize::wrap`] applies it to one [`Callable`]: the
//! callable is fingerprinted once, its cache is fetched from (or created in)
//! the [`CacheRegistry`], and the result is a [`Memoized`] function.
//!
//! A [`Memoized`] function resolves its cache through the registry on every
//! call. Once the registry drops the cache, whether at the horizon or on
//! [`CacheRegistry::remove`], the next call starts over with a fresh one.
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use muninn::cache::LruCache;
//! use muninn::{CacheRegistry, Memoize, callable};
//!
//! static CALLS: AtomicUsize = AtomicUsize::new(0);
//!
//! fn connect(dsn: String) -> String {
//!     CALLS.fetch_add(1, Ordering::SeqCst);
//!     format!("client for {dsn}")
//! }
//!
//! let registry = CacheRegistry::new();
//! let memo = Memoize::builder()
//!     .cache(|| LruCache::new(16))
//!     .key(|dsn: &String| dsn.clone())
//!     .build()
//!     .unwrap();
//!
//! let connect = memo.wrap(&registry, callable!(connect)).unwrap();
//! connect.call("pg://a".to_string());
//! connect.call("pg://a".to_string());
//! assert_eq!(CALLS.load(Ordering::SeqCst), 1);
//! ```
//!
//! The cache lock is only taken for the lookup and the store, never while
//! the wrapped function runs. Concurrent misses on one key may therefore
//! each compute a value; the last store wins.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::{CacheSpec, KeyedCache, SharedCache};
use crate::fingerprint::{Callable, Fingerprint};
use crate::registry::CacheRegistry;
use crate::telemetry;
use crate::{MuninnError, Result};

type CacheFactory<K, V> = Arc<dyn Fn() -> Result<SharedCache<K, V>> + Send + Sync>;
type KeyFn<A, K> = Arc<dyn Fn(&A) -> K + Send + Sync>;

/// Reusable memoization settings: how to build a cache and how to key it.
///
/// One `Memoize` can wrap any number of functions; each gets its own cache.
pub struct Memoize<A, K, V> {
    factory: CacheFactory<K, V>,
    key_fn: KeyFn<A, K>,
}

impl<A, K, V> Clone for Memoize<A, K, V> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<A, K, V> Memoize<A, K, V>
where
    A: 'static,
    K: 'static,
    V: 'static,
{
    /// Create a builder.
    pub fn builder() -> MemoizeBuilder<A, K, V> {
        MemoizeBuilder::new()
    }

    /// Settings from an infallible cache factory and a key function.
    pub fn new<C, G, H>(cache: G, key: H) -> Self
    where
        C: KeyedCache<K, V> + 'static,
        G: Fn() -> C + Send + Sync + 'static,
        H: Fn(&A) -> K + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || Ok(Arc::new(cache()) as SharedCache<K, V>)),
            key_fn: Arc::new(key),
        }
    }

    /// Memoize `callable`, sharing its cache with any earlier wrap of the
    /// same fingerprint that is still registered.
    ///
    /// The cache factory only runs when the registry has no live cache for
    /// the fingerprint; its error is returned as
    /// [`MuninnError::CacheFactory`].
    pub fn wrap<F>(
        &self,
        registry: &CacheRegistry,
        callable: Callable<F>,
    ) -> Result<Memoized<F, A, K, V>> {
        let (fingerprint, method) = callable.derive();
        let name = callable.qualified_name();
        let cache = registry.get_or_create(&fingerprint, || (self.factory)())?;
        debug!(
            function = name,
            %fingerprint,
            ?method,
            kind = %cache.kind(),
            "memoized function"
        );
        Ok(Memoized {
            function: callable.into_inner(),
            key_fn: Arc::clone(&self.key_fn),
            factory: Arc::clone(&self.factory),
            registry: registry.clone(),
            fingerprint,
            name,
        })
    }
}

/// Builder for [`Memoize`].
pub struct MemoizeBuilder<A, K, V> {
    factory: Option<CacheFactory<K, V>>,
    key_fn: Option<KeyFn<A, K>>,
    spec: Option<CacheSpec>,
}

impl<A, K, V> Default for MemoizeBuilder<A, K, V> {
    fn default() -> Self {
        Self {
            factory: None,
            key_fn: None,
            spec: None,
        }
    }
}

impl<A, K, V> MemoizeBuilder<A, K, V>
where
    A: 'static,
    K: 'static,
    V: 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Build each function's cache with `factory`.
    pub fn cache<C, G>(mut self, factory: G) -> Self
    where
        C: KeyedCache<K, V> + 'static,
        G: Fn() -> C + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || Ok(Arc::new(factory()) as SharedCache<K, V>)));
        self.spec = None;
        self
    }

    /// Build each function's cache with a factory that may fail.
    pub fn try_cache<G>(mut self, factory: G) -> Self
    where
        G: Fn() -> Result<SharedCache<K, V>> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self.spec = None;
        self
    }

    /// Derive the cache key from the call arguments.
    ///
    /// Distinct arguments may map to the same key on purpose; such calls
    /// share one cached value.
    pub fn key<H>(mut self, key: H) -> Self
    where
        H: Fn(&A) -> K + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key));
        self
    }

    /// Validate and build the settings.
    pub fn build(self) -> Result<Memoize<A, K, V>> {
        if let Some(spec) = &self.spec {
            spec.validate()?;
        }
        let factory = self
            .factory
            .ok_or_else(|| MuninnError::config("memoize requires a cache factory"))?;
        let key_fn = self
            .key_fn
            .ok_or_else(|| MuninnError::config("memoize requires a key function"))?;
        Ok(Memoize { factory, key_fn })
    }
}

impl<A, K, V> MemoizeBuilder<A, K, V>
where
    A: 'static,
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Build each function's cache from a declarative spec.
    pub fn spec(mut self, spec: CacheSpec) -> Self {
        let template = spec.clone();
        self.factory = Some(Arc::new(move || template.build()));
        self.spec = Some(spec);
        self
    }
}

impl<A, V> MemoizeBuilder<A, A, V>
where
    A: Clone + 'static,
    V: 'static,
{
    /// Use the arguments themselves as the key.
    pub fn key_args(self) -> Self {
        self.key(A::clone)
    }
}

/// A memoized function.
///
/// Arguments are passed as a single value; functions of several arguments
/// take a tuple.
///
/// If the registry can no longer supply a cache (the factory fails when
/// rebuilding one), calls run the function uncached and log a warning.
pub struct Memoized<F, A, K, V> {
    function: F,
    key_fn: KeyFn<A, K>,
    factory: CacheFactory<K, V>,
    registry: CacheRegistry,
    fingerprint: Fingerprint,
    name: &'static str,
}

impl<F, A, K, V> Memoized<F, A, K, V>
where
    K: 'static,
    V: 'static,
{
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The per-function cache currently registered, created if the registry
    /// has dropped the previous one.
    pub fn cache(&self) -> Result<SharedCache<K, V>> {
        self.registry
            .get_or_create(&self.fingerprint, || (self.factory)())
    }

    /// Qualified type name of the wrapped function.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Drop the cached value for `args`, if any.
    pub fn forget(&self, args: &A) -> Option<V> {
        let cache = self.registry.get::<K, V>(&self.fingerprint)?;
        cache.remove(&(self.key_fn)(args))
    }

    /// Drop every cached value of this function.
    pub fn clear(&self) {
        if let Some(cache) = self.registry.get::<K, V>(&self.fingerprint) {
            cache.clear();
        }
    }

    fn current(&self) -> Option<SharedCache<K, V>> {
        match self.cache() {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!(function = self.name, error = %err, "memo cache unavailable, calling uncached");
                None
            }
        }
    }

    fn lookup(&self, cache: &SharedCache<K, V>, key: &K) -> Option<V> {
        let kind = cache.kind().as_str();
        match cache.get(key) {
            Some(value) => {
                trace!(function = self.name, "memo hit");
                metrics::counter!(telemetry::MEMO_HITS_TOTAL, "kind" => kind).increment(1);
                Some(value)
            }
            None => {
                trace!(function = self.name, "memo miss");
                metrics::counter!(telemetry::MEMO_MISSES_TOTAL, "kind" => kind).increment(1);
                None
            }
        }
    }
}

impl<F, A, K, V> Memoized<F, A, K, V>
where
    K: 'static,
    V: Clone + 'static,
{
    /// Return the cached value for `args`, computing and storing it on a miss.
    pub fn call(&self, args: A) -> V
    where
        F: Fn(A) -> V,
    {
        let key = (self.key_fn)(&args);
        let cache = self.current();
        if let Some(value) = cache.as_ref().and_then(|c| self.lookup(c, &key)) {
            return value;
        }
        let value = (self.function)(args);
        if let Some(cache) = cache {
            cache.put(key, value.clone());
        }
        value
    }

    /// Like [`call()`](Self::call) for a fallible function. Errors are
    /// returned unchanged and never cached.
    pub fn try_call<E>(&self, args: A) -> std::result::Result<V, E>
    where
        F: Fn(A) -> std::result::Result<V, E>,
    {
        let key = (self.key_fn)(&args);
        let cache = self.current();
        if let Some(value) = cache.as_ref().and_then(|c| self.lookup(c, &key)) {
            return Ok(value);
        }
        let value = (self.function)(args)?;
        if let Some(cache) = cache {
            cache.put(key, value.clone());
        }
        Ok(value)
    }

    /// Like [`call()`](Self::call) for a function returning a future.
    pub async fn call_async<Fut>(&self, args: A) -> V
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = V>,
    {
        let key = (self.key_fn)(&args);
        let cache = self.current();
        if let Some(value) = cache.as_ref().and_then(|c| self.lookup(c, &key)) {
            return value;
        }
        let value = (self.function)(args).await;
        if let Some(cache) = cache {
            cache.put(key, value.clone());
        }
        value
    }
}
