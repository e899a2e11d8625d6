//! Application builder.

use axum::{routing::get, Router};
use cachet::{CacheFacade, CacheOptions};
use cachet_config::AppConfig;
use cachet_core::CacheResult;
use cachet_rest::{create_router, AppState, ItemCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Simulated upstream latency for the demo catalog.
pub const DEMO_CATALOG_LATENCY: Duration = Duration::from_millis(250);

/// A built application: the router plus the cache it depends on.
pub struct App {
    pub router: Router,
    pub cache: Arc<CacheFacade>,
}

/// Application builder for constructing the server.
#[derive(Default)]
pub struct AppBuilder {
    config: Option<AppConfig>,
    catalog: Option<Arc<ItemCatalog>>,
    metrics: Option<PrometheusHandle>,
}

impl AppBuilder {
    /// Creates a new application builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the demo catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<ItemCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Exposes metrics from `handle` on the configured path.
    #[must_use]
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Connects the cache and assembles the router.
    ///
    /// Fails if the cache backend cannot be reached.
    pub async fn build(self) -> CacheResult<App> {
        let config = self.config.unwrap_or_default();

        let cache = Arc::new(CacheFacade::from_config(&config.cache));
        cache.init_with_config(&config.cache).await?;

        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(ItemCatalog::sample(DEMO_CATALOG_LATENCY)));

        let state = AppState::new(
            Arc::clone(&cache),
            catalog,
            CacheOptions::from_config(&config.cache),
        );
        let mut router = create_router(state, &config.server);

        if let Some(handle) = self.metrics.filter(|_| config.observability.metrics_enabled) {
            let path = config.observability.metrics_path.clone();
            info!("Metrics exposed at {}", path);
            router = router.route(&path, get(move || std::future::ready(handle.render())));
        }

        Ok(App { router, cache })
    }
}
