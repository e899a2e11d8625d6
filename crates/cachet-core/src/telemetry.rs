//! Tracing subscriber setup.
//!
//! Library crates only emit `tracing` events; binaries call
//! [`init_telemetry`] once at startup to install a subscriber.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::CacheResult;
use serde::{Deserialize, Serialize};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,cachet=debug,tower_http=debug";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to include the event target in each line.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Fails if a global
/// subscriber is already set.
#[cfg(feature = "telemetry")]
pub fn init_telemetry(config: &TelemetryConfig) -> CacheResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| crate::CacheError::configuration(format!("Invalid log filter: {}", e)))?;

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    result.map_err(|e| crate::CacheError::internal(format!("Failed to install subscriber: {}", e)))?;

    tracing::info!(filter = %config.filter, format = ?config.format, "Telemetry initialized");
    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_telemetry(_config: &TelemetryConfig) -> CacheResult<()> {
    Ok(())
}
