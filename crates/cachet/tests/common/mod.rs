//! Shared fixtures for cache integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use cachet::{CacheError, CacheFacade, CacheResult, MemoryStore, SetOptions, Store};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Backend {}

    #[async_trait]
    impl Store for Backend {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;
        async fn set(
            &self,
            key: &str,
            value: &[u8],
            expire: Option<Duration>,
            options: SetOptions,
        ) -> CacheResult<bool>;
        async fn exists(&self, key: &str) -> CacheResult<bool>;
        async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;
        async fn delete(&self, key: &str) -> CacheResult<bool>;
        async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;
        async fn keys(&self, fragment: &str) -> CacheResult<Vec<String>>;
        async fn ping(&self) -> CacheResult<()>;
        async fn close(&self);
        fn name(&self) -> &'static str;
    }
}

/// A store whose reads and writes fail as if Redis went away.
pub fn unreachable_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend
        .expect_get()
        .returning(|_| Err(CacheError::connection("Connection refused (os error 111)")));
    backend
        .expect_set()
        .returning(|_, _, _, _| Err(CacheError::connection("Connection refused (os error 111)")));
    backend.expect_name().return_const("mock");
    backend.expect_close().return_const(());
    backend
}

/// A facade over a fresh in-memory store.
pub async fn memory_facade(namespace: &str) -> Arc<CacheFacade> {
    let facade = Arc::new(CacheFacade::new(namespace));
    facade
        .init_with_store(Arc::new(MemoryStore::new()))
        .await
        .expect("memory store init");
    facade
}

/// A facade over a mocked store.
pub async fn mock_facade(namespace: &str, backend: MockBackend) -> Arc<CacheFacade> {
    let facade = Arc::new(CacheFacade::new(namespace));
    facade
        .init_with_store(Arc::new(backend))
        .await
        .expect("mock store init");
    facade
}

/// Counts handler invocations.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
