//! Server startup utilities.

use cachet_config::AppConfig;
use cachet_core::{CacheError, CacheResult};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing::{error, info};

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
                 __         __
  _________ _____/ /_  ___  / /_
 / ___/ __ `/ ___/ __ \/ _ \/ __/
/ /__/ /_/ / /__/ / / /  __/ /_
\___/\__,_/\___/_/ /_/\___/\__/
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    let base = format!("http://{}", config.server.addr());
    info!("{}", separator);
    info!("REST API:  {}/api/v1", base);
    info!("Health:    {}/health", base);
    if config.observability.metrics_enabled {
        info!("Metrics:   {}{}", base, config.observability.metrics_path);
    }
    info!("Cache:     {} (namespace '{}')", redact_url(&config.cache.url), config.cache.namespace);
    info!("{}", separator);
}

/// Installs the global Prometheus recorder and describes cache metrics.
pub fn install_metrics() -> CacheResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| CacheError::internal(format!("Failed to install metrics recorder: {}", e)))?;
    cachet::metrics::register_metrics();
    Ok(handle)
}

/// Resolves when the process receives Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}

/// Hides the password in a connection URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
