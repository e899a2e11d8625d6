//! Common test infrastructure for Redis integration tests.

use cachet_config::CacheConfig;
use cachet_store::RedisStore;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::{Redis, REDIS_PORT};

/// Test Redis container wrapper.
///
/// Keeps the container alive for as long as the store is in use.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    config: CacheConfig,
}

impl TestRedis {
    /// Starts a fresh Redis container.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(REDIS_PORT)
            .await
            .expect("Failed to get Redis port");

        let mut config = CacheConfig::with_url(format!("redis://127.0.0.1:{}", port));
        config.pool_size = 4;

        Self {
            _container: container,
            config,
        }
    }

    /// Returns the connection settings for this container.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Connects a store, retrying while the server is still starting.
    pub async fn store(&self) -> RedisStore {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match RedisStore::connect(&self.config).await {
                Ok(store) => return store,
                Err(e) => {
                    if attempts >= 30 {
                        panic!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                }
            }
        }
    }
}
