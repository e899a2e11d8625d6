//! # Cachet Server
//!
//! Demo HTTP server: an item API whose lookups are cached through Cachet.

use cachet_config::{AppConfig, ConfigLoader};
use cachet_core::telemetry::{init_telemetry, TelemetryConfig};
use cachet_core::{CacheError, CacheResult};
use cachet_server::startup::{install_metrics, print_banner, print_startup_info, shutdown_signal};
use cachet_server::AppBuilder;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.get().await,
        Err(e) => {
            let _ = init_telemetry(&TelemetryConfig::default());
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.observability.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    print_banner();
    info!("Starting Cachet demo server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    if let Err(e) = run(config).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> CacheResult<()> {
    let metrics = if config.observability.metrics_enabled {
        Some(install_metrics()?)
    } else {
        None
    };

    let app = AppBuilder::new()
        .with_config(config.clone())
        .with_metrics(metrics)
        .build()
        .await?;

    // Releases the cache even if serving bails out early.
    let guard = app.cache.guard();

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CacheError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    print_startup_info(&config);

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CacheError::internal(format!("REST server error: {}", e)))?;

    guard.close().await;
    info!("Server shutdown complete");
    Ok(())
}
