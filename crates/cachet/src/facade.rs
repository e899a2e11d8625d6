//! The cache facade: key derivation in front of a pluggable store.

use crate::codec::{Codec, JsonCodec};
use cachet_config::CacheConfig;
use cachet_core::{CacheError, CacheResult, KeyArgs, KEY_SEPARATOR};
use cachet_store::{SetOptions, Store};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

enum Lifecycle {
    Uninitialized,
    Ready(Arc<dyn Store>),
    Closed,
}

/// Process-wide cache handle.
///
/// Accepts unbuilt identifiers ([`KeyArgs`]), derives the final key under
/// its namespace and delegates to the [`Store`] installed by `init`. Share
/// it through an `Arc`; all methods take `&self`.
///
/// ```no_run
/// # async fn demo() -> cachet_core::CacheResult<()> {
/// use cachet::CacheFacade;
/// use cachet_core::KeyArgs;
///
/// let cache = CacheFacade::new("shop");
/// cache.init("redis://localhost:6379").await?;
/// cache
///     .set(KeyArgs::new("greeting").prefix("i18n"), "hello", None)
///     .await?;
/// let hit: Option<String> = cache.get(KeyArgs::new("greeting").prefix("i18n")).await?;
/// cache.close().await;
/// # Ok(())
/// # }
/// ```
pub struct CacheFacade {
    namespace: String,
    codec: Arc<dyn Codec>,
    config: CacheConfig,
    state: RwLock<Lifecycle>,
}

impl CacheFacade {
    /// Creates an uninitialized facade for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let config = CacheConfig {
            namespace: namespace.clone(),
            ..CacheConfig::default()
        };
        Self {
            namespace,
            codec: Arc::new(JsonCodec),
            config,
            state: RwLock::new(Lifecycle::Uninitialized),
        }
    }

    /// Creates an uninitialized facade that takes namespace and pool
    /// settings from `config`.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            codec: Arc::new(JsonCodec),
            config: config.clone(),
            state: RwLock::new(Lifecycle::Uninitialized),
        }
    }

    /// Replaces the value codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Namespace placed in front of every key.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Settings the facade was created with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true between a successful `init` and `close`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(*self.state.read(), Lifecycle::Ready(_))
    }

    /// Connects to the backend named by `connection_url`.
    ///
    /// Supported schemes are `redis://`, `rediss://`, `redis+unix://`,
    /// `unix://` and `memory://`. A connection failure is returned as is and
    /// leaves the facade uninitialized.
    pub async fn init(&self, connection_url: &str) -> CacheResult<()> {
        let config = CacheConfig {
            url: connection_url.to_string(),
            ..self.config.clone()
        };
        self.init_with_config(&config).await
    }

    /// Connects using the URL and pool settings in `config`.
    pub async fn init_with_config(&self, config: &CacheConfig) -> CacheResult<()> {
        self.ensure_uninitialized()?;
        let store = cachet_store::connect(config).await?;
        self.install(store).await
    }

    /// Installs an already constructed store.
    pub async fn init_with_store(&self, store: Arc<dyn Store>) -> CacheResult<()> {
        self.ensure_uninitialized()?;
        self.install(store).await
    }

    fn ensure_uninitialized(&self) -> CacheResult<()> {
        match *self.state.read() {
            Lifecycle::Ready(_) => Err(CacheError::AlreadyInitialized),
            Lifecycle::Uninitialized | Lifecycle::Closed => Ok(()),
        }
    }

    async fn install(&self, store: Arc<dyn Store>) -> CacheResult<()> {
        let backend = store.name();
        let raced = {
            let mut state = self.state.write();
            if matches!(*state, Lifecycle::Ready(_)) {
                true
            } else {
                *state = Lifecycle::Ready(Arc::clone(&store));
                false
            }
        };

        if raced {
            store.close().await;
            return Err(CacheError::AlreadyInitialized);
        }

        info!(backend, namespace = %self.namespace, codec = self.codec.name(), "Cache initialized");
        Ok(())
    }

    /// Releases the store. Later calls fail with [`CacheError::Closed`].
    ///
    /// Closing twice, or before `init`, does nothing.
    pub async fn close(&self) {
        if let Some(store) = self.take_store() {
            store.close().await;
            info!(namespace = %self.namespace, "Cache closed");
        }
    }

    /// Moves the store out and marks the facade closed.
    fn take_store(&self) -> Option<Arc<dyn Store>> {
        let mut state = self.state.write();
        match std::mem::replace(&mut *state, Lifecycle::Closed) {
            Lifecycle::Ready(store) => Some(store),
            Lifecycle::Uninitialized => {
                *state = Lifecycle::Uninitialized;
                None
            }
            Lifecycle::Closed => None,
        }
    }

    /// Returns a guard that closes the facade when dropped.
    #[must_use]
    pub fn guard(self: &Arc<Self>) -> CacheGuard {
        CacheGuard {
            facade: Some(Arc::clone(self)),
        }
    }

    fn store(&self) -> CacheResult<Arc<dyn Store>> {
        match &*self.state.read() {
            Lifecycle::Ready(store) => Ok(Arc::clone(store)),
            Lifecycle::Uninitialized => Err(CacheError::NotInitialized),
            Lifecycle::Closed => Err(CacheError::Closed),
        }
    }

    /// Derives the final key for `args` under this facade's namespace.
    pub fn build_key(&self, args: &KeyArgs) -> CacheResult<String> {
        args.build(&self.namespace)
    }

    /// Reads and decodes a value. `Ok(None)` is a miss.
    pub async fn get<T: DeserializeOwned>(&self, args: impl Into<KeyArgs>) -> CacheResult<Option<T>> {
        let key = self.build_key(&args.into())?;
        self.get_by_key(&key).await
    }

    /// Encodes and writes a value. `None` for `expire` persists it.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        args: impl Into<KeyArgs>,
        value: &T,
        expire: Option<Duration>,
    ) -> CacheResult<bool> {
        self.set_with(args, value, expire, SetOptions::default()).await
    }

    /// Like [`set`](Self::set) with backend write conditions.
    pub async fn set_with<T: Serialize + ?Sized>(
        &self,
        args: impl Into<KeyArgs>,
        value: &T,
        expire: Option<Duration>,
        options: SetOptions,
    ) -> CacheResult<bool> {
        let key = self.build_key(&args.into())?;
        let value = serde_json::to_value(value)?;
        self.set_value_by_key(&key, &value, expire, options).await
    }

    /// Checks whether the derived key exists.
    pub async fn exists(&self, args: impl Into<KeyArgs>) -> CacheResult<bool> {
        let key = self.build_key(&args.into())?;
        self.store()?.exists(&key).await
    }

    /// Updates the TTL of the derived key. `Ok(false)` if it does not exist.
    pub async fn expire(&self, args: impl Into<KeyArgs>, ttl: Duration) -> CacheResult<bool> {
        let key = self.build_key(&args.into())?;
        let updated = self.store()?.expire(&key, ttl).await?;
        if !updated {
            debug!("Expire on missing key '{}'", key);
        }
        Ok(updated)
    }

    /// Deletes the derived key.
    pub async fn delete(&self, args: impl Into<KeyArgs>) -> CacheResult<bool> {
        let key = self.build_key(&args.into())?;
        self.store()?.delete(&key).await
    }

    /// Deletes every key below the derived key.
    ///
    /// Matches at a component boundary: `shop:items` removes `shop:items:1`
    /// but leaves `shop:items_v2:1` and `shop:items` itself.
    pub async fn delete_startswith(&self, args: impl Into<KeyArgs>) -> CacheResult<u64> {
        let key = self.build_key(&args.into())?;
        let prefix = format!("{}{}", key, KEY_SEPARATOR);
        let removed = self.store()?.delete_by_prefix(&prefix).await?;
        info!(prefix = %prefix, removed, "Invalidated cache entries");
        Ok(removed)
    }

    /// Lists stored keys containing the derived key.
    pub async fn keys(&self, args: impl Into<KeyArgs>) -> CacheResult<Vec<String>> {
        let key = self.build_key(&args.into())?;
        self.store()?.keys(&key).await
    }

    /// Checks that the backend answers.
    pub async fn ping(&self) -> CacheResult<()> {
        self.store()?.ping().await
    }

    pub(crate) async fn get_by_key<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(bytes) = self.store()?.get(key).await? else {
            debug!("Cache miss for key '{}'", key);
            return Ok(None);
        };
        debug!("Cache hit for key '{}'", key);
        let value = self.codec.decode(&bytes)?;
        Ok(Some(serde_json::from_value(value)?))
    }

    pub(crate) async fn set_value_by_key(
        &self,
        key: &str,
        value: &Value,
        expire: Option<Duration>,
        options: SetOptions,
    ) -> CacheResult<bool> {
        let bytes = self.codec.encode(value)?;
        let written = self.store()?.set(key, &bytes, expire, options).await?;
        debug!("Cached key '{}' (expire: {:?}, written: {})", key, expire, written);
        Ok(written)
    }
}

impl fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.read() {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Ready(store) => store.name(),
            Lifecycle::Closed => "closed",
        };
        f.debug_struct("CacheFacade")
            .field("namespace", &self.namespace)
            .field("codec", &self.codec.name())
            .field("state", &state)
            .finish()
    }
}

/// Closes a facade when dropped.
///
/// Prefer awaiting [`CacheGuard::close`]; the drop path hands the store's
/// `close` to the current Tokio runtime, or just drops the store if there
/// is none.
#[must_use = "dropping the guard closes the cache"]
pub struct CacheGuard {
    facade: Option<Arc<CacheFacade>>,
}

impl CacheGuard {
    /// Closes the facade and disarms the guard.
    pub async fn close(mut self) {
        if let Some(facade) = self.facade.take() {
            facade.close().await;
        }
    }

    /// Disarms the guard without closing.
    pub fn disarm(mut self) {
        self.facade = None;
    }
}

impl Drop for CacheGuard {
    fn drop(&mut self) {
        let Some(facade) = self.facade.take() else {
            return;
        };
        let Some(store) = facade.take_store() else {
            return;
        };

        warn!(namespace = %facade.namespace, "Cache guard dropped without close; releasing store");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { store.close().await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_core::KeyParams;
    use cachet_store::MemoryStore;

    async fn memory_facade(namespace: &str) -> CacheFacade {
        let facade = CacheFacade::new(namespace);
        facade.init("memory://").await.unwrap();
        facade
    }

    #[tokio::test]
    async fn test_uninitialized_fails_fast() {
        let facade = CacheFacade::new("ns");
        assert!(!facade.is_initialized());
        let err = facade.get::<String>("k").await.unwrap_err();
        assert!(matches!(err, CacheError::NotInitialized));
    }

    #[tokio::test]
    async fn test_closed_fails_fast() {
        let facade = memory_facade("ns").await;
        facade.close().await;
        let err = facade.exists("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Closed));
        facade.close().await;
    }

    #[tokio::test]
    async fn test_second_init_rejected() {
        let facade = memory_facade("ns").await;
        let err = facade.init("memory://").await.unwrap_err();
        assert!(matches!(err, CacheError::AlreadyInitialized));
        assert!(facade.is_initialized());
    }

    #[tokio::test]
    async fn test_reinit_after_close() {
        let facade = memory_facade("ns").await;
        facade.close().await;
        facade
            .init_with_store(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(facade.is_initialized());
    }

    #[tokio::test]
    async fn test_close_before_init_is_noop() {
        let facade = CacheFacade::new("ns");
        facade.close().await;
        assert!(matches!(facade.get::<u8>("k").await, Err(CacheError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_init_bad_scheme_stays_uninitialized() {
        let facade = CacheFacade::new("ns");
        assert!(facade.init("ftp://example.com").await.is_err());
        assert!(!facade.is_initialized());
    }

    #[test]
    fn test_build_key_uses_namespace() {
        let facade = CacheFacade::new("shop");
        let args = KeyArgs::new("get_item")
            .prefix("items")
            .params(KeyParams::new().with("id", 7));
        assert_eq!(facade.build_key(&args).unwrap(), "shop:items:get_item:id=7");
    }

    #[tokio::test]
    async fn test_stored_null_is_a_hit() {
        let facade = memory_facade("ns").await;
        facade.set("nothing", &Option::<u32>::None, None).await.unwrap();
        let hit: Option<Option<u32>> = facade.get("nothing").await.unwrap();
        assert_eq!(hit, Some(None));
        let miss: Option<Option<u32>> = facade.get("absent").await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_guard_close() {
        let facade = Arc::new(memory_facade("ns").await);
        let guard = facade.guard();
        guard.close().await;
        assert!(!facade.is_initialized());
    }

    #[tokio::test]
    async fn test_guard_drop_closes() {
        let facade = Arc::new(memory_facade("ns").await);
        drop(facade.guard());
        assert!(matches!(facade.ping().await, Err(CacheError::Closed)));
    }

    #[tokio::test]
    async fn test_guard_disarm() {
        let facade = Arc::new(memory_facade("ns").await);
        facade.guard().disarm();
        assert!(facade.is_initialized());
    }

    #[test]
    fn test_debug_shows_state() {
        let facade = CacheFacade::new("ns");
        assert!(format!("{:?}", facade).contains("uninitialized"));
    }
}
