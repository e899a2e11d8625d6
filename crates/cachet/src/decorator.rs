//! Read-through caching around request handlers.

use crate::codec::is_empty_value;
use crate::metrics;
use crate::CacheFacade;
use cachet_config::CacheConfig;
use cachet_core::{CacheError, CacheResult, KeyArgs, KeyBuilder, KeyParams};
use cachet_store::SetOptions;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default entry lifetime for decorated handlers.
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(60);

/// Per-handler caching options.
#[derive(Clone)]
pub struct CacheOptions {
    /// Base key. Defaults to the wrapped function's type name.
    pub key: Option<String>,
    /// Entry lifetime. `None` persists until deleted.
    pub expire: Option<Duration>,
    /// Prefix placed between namespace and base key.
    pub prefix: Option<String>,
    /// Whether null or empty results are stored.
    pub none: bool,
    /// Whether call arguments become part of the key.
    pub use_params: bool,
    /// Replaces default key derivation entirely.
    pub key_builder: Option<Arc<dyn KeyBuilder>>,
    /// On backend failure, log and compute without the cache.
    pub fail_open: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            key: None,
            expire: Some(DEFAULT_EXPIRE),
            prefix: None,
            none: true,
            use_params: true,
            key_builder: None,
            fail_open: false,
        }
    }
}

impl CacheOptions {
    /// Defaults with expiry and fail-open taken from configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            expire: Some(config.default_expire()),
            fail_open: config.fail_open,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    /// Stores results without expiry.
    #[must_use]
    pub fn persist(mut self) -> Self {
        self.expire = None;
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn none(mut self, none: bool) -> Self {
        self.none = none;
        self
    }

    #[must_use]
    pub fn use_params(mut self, use_params: bool) -> Self {
        self.use_params = use_params;
        self
    }

    #[must_use]
    pub fn key_builder(mut self, builder: Arc<dyn KeyBuilder>) -> Self {
        self.key_builder = Some(builder);
        self
    }

    #[must_use]
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("key", &self.key)
            .field("expire", &self.expire)
            .field("prefix", &self.prefix)
            .field("none", &self.none)
            .field("use_params", &self.use_params)
            .field("custom_key_builder", &self.key_builder.is_some())
            .field("fail_open", &self.fail_open)
            .finish()
    }
}

/// Wraps `f` so its results are cached in `facade`.
///
/// ```no_run
/// # async fn demo() -> cachet_core::CacheResult<()> {
/// use cachet::{cached, CacheFacade, CacheOptions};
/// use std::sync::Arc;
///
/// let cache = Arc::new(CacheFacade::new("shop"));
/// cache.init("memory://").await?;
///
/// let options = CacheOptions::default().key("item").prefix("items");
/// let lookup = cached(cache, options, |id: u64| async move {
///     format!("item-{}", id)
/// });
/// let name: String = lookup.call(7).await?;
/// # Ok(())
/// # }
/// ```
pub fn cached<F>(facade: Arc<CacheFacade>, options: CacheOptions, f: F) -> Cached<F> {
    Cached { facade, options, f }
}

/// A handler wrapped with read-through caching.
///
/// Concurrent misses for the same key each run the handler; the last write
/// wins.
pub struct Cached<F> {
    facade: Arc<CacheFacade>,
    options: CacheOptions,
    f: F,
}

impl<F> Cached<F> {
    /// Options this wrapper was built with.
    #[must_use]
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// The facade results are cached in.
    #[must_use]
    pub fn facade(&self) -> &Arc<CacheFacade> {
        &self.facade
    }

    /// Base key: the configured key or the wrapped function's type name.
    ///
    /// Closures, function pointers and trait objects share type names with
    /// unrelated handlers, so they need an explicit `key` unless a custom
    /// key builder derives the key instead.
    pub fn base_key(&self) -> CacheResult<&str> {
        if let Some(key) = self.options.key.as_deref() {
            return Ok(key);
        }
        let name = std::any::type_name::<F>();
        if self.options.key_builder.is_none() && !is_named_fn(name) {
            return Err(CacheError::key_builder(format!(
                "`{}` has no stable identity, set an explicit key",
                name
            )));
        }
        Ok(name)
    }

    /// Derives the final key for a call with `args`.
    pub fn key_for<A: Serialize + ?Sized>(&self, args: &A) -> CacheResult<String> {
        let mut key_args = KeyArgs::new(self.base_key()?);
        key_args.prefix.clone_from(&self.options.prefix);
        key_args.key_builder.clone_from(&self.options.key_builder);
        if self.options.use_params {
            key_args.params = Some(KeyParams::from_serializable(args)?);
        }
        self.facade.build_key(&key_args)
    }

    /// Invokes an async handler through the cache.
    pub async fn call<A, R, Fut>(&self, args: A) -> CacheResult<R>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = R>,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        let key = self.key_for(&args)?;
        if let Some(hit) = self.lookup(&key).await? {
            return Ok(hit);
        }
        let result = (self.f)(args).await;
        self.store(&key, &result).await?;
        Ok(result)
    }

    /// Invokes a fallible async handler through the cache.
    ///
    /// Handler errors are returned as is and never cached. Cache errors are
    /// converted into `E`.
    pub async fn try_call<A, R, E, Fut>(&self, args: A) -> Result<R, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        A: Serialize,
        R: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        let key = self.key_for(&args)?;
        if let Some(hit) = self.lookup(&key).await? {
            return Ok(hit);
        }
        let result = (self.f)(args).await?;
        self.store(&key, &result).await?;
        Ok(result)
    }

    /// Invokes a synchronous handler through the cache.
    pub async fn call_sync<A, R>(&self, args: A) -> CacheResult<R>
    where
        F: Fn(A) -> R,
        A: Serialize,
        R: Serialize + DeserializeOwned,
    {
        let key = self.key_for(&args)?;
        if let Some(hit) = self.lookup(&key).await? {
            return Ok(hit);
        }
        let result = (self.f)(args);
        self.store(&key, &result).await?;
        Ok(result)
    }

    fn metric_prefix(&self) -> &str {
        self.options.prefix.as_deref().unwrap_or(metrics::NO_PREFIX)
    }

    async fn lookup<R: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<R>> {
        let prefix = self.metric_prefix();
        match self.facade.get_by_key::<R>(key).await {
            Ok(Some(hit)) => {
                metrics::record_hit(prefix);
                Ok(Some(hit))
            }
            Ok(None) => {
                metrics::record_miss(prefix);
                Ok(None)
            }
            Err(e) => self.absorb(e, "get").map(|()| None),
        }
    }

    async fn store<R: Serialize>(&self, key: &str, result: &R) -> CacheResult<()> {
        let prefix = self.metric_prefix();
        let value = serde_json::to_value(result)?;

        if !self.options.none && is_empty_value(&value) {
            debug!("Not caching empty result for key '{}'", key);
            metrics::record_skipped(prefix);
            return Ok(());
        }

        match self
            .facade
            .set_value_by_key(key, &value, self.options.expire, SetOptions::default())
            .await
        {
            Ok(_) => {
                metrics::record_set(prefix);
                Ok(())
            }
            Err(e) => self.absorb(e, "set"),
        }
    }

    /// Swallows backend failures when failing open; everything else propagates.
    fn absorb(&self, err: CacheError, operation: &'static str) -> CacheResult<()> {
        metrics::record_error(self.metric_prefix(), operation);
        if self.options.fail_open && err.is_retriable() {
            warn!(error = %err, operation, "Cache unavailable, computing without cache");
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// True for type names that identify exactly one function item.
fn is_named_fn(type_name: &str) -> bool {
    !(type_name.contains("{{closure}}")
        || type_name.contains("dyn ")
        || type_name.contains("fn("))
}

impl<F> fmt::Debug for Cached<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("handler", &std::any::type_name::<F>())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
