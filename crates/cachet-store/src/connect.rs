//! Backend selection from a connection URL.

use crate::{MemoryStore, RedisStore, Store};
use cachet_config::{BackendKind, CacheConfig};
use cachet_core::CacheResult;
use std::sync::Arc;
use tracing::info;

/// Opens the store selected by `config.url`.
///
/// Redis URLs are dialed eagerly, so an unreachable server fails here with
/// a connection error rather than on the first cache call.
pub async fn connect(config: &CacheConfig) -> CacheResult<Arc<dyn Store>> {
    let backend = config.backend()?;
    info!(backend = %backend, "Connecting cache store");

    let store: Arc<dyn Store> = match backend {
        BackendKind::Redis => Arc::new(RedisStore::connect(config).await?),
        BackendKind::Memory => Arc::new(MemoryStore::new()),
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_core::CacheError;

    #[tokio::test]
    async fn test_memory_url() {
        let store = connect(&CacheConfig::with_url("memory://")).await.unwrap();
        assert_eq!(store.name(), "memory");
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let result = connect(&CacheConfig::with_url("memcached://localhost")).await;
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }
}
