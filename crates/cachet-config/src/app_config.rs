//! Application configuration structures.

use cachet_core::telemetry::TelemetryConfig;
use cachet_core::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Cache backend configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "cachet".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the bind address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Backend selected by the cache URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// `redis://`, `rediss://`, `redis+unix://` or `unix://`.
    Redis,
    /// `memory://`, an in-process map.
    Memory,
}

impl BackendKind {
    /// Resolves the backend for a connection URL.
    pub fn from_url(url: &str) -> CacheResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| CacheError::configuration(format!("Invalid cache URL '{}': {}", url, e)))?;

        match parsed.scheme() {
            "redis" | "rediss" | "redis+unix" | "unix" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(CacheError::configuration(format!(
                "Unsupported cache URL scheme '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend connection URL.
    pub url: String,
    /// Namespace placed in front of every key.
    pub namespace: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Connection and pool wait timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Expiry used by decorated handlers that do not set one.
    pub default_expire_secs: u64,
    /// Fall back to computing without the cache when the backend fails.
    pub fail_open: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            namespace: String::new(),
            pool_size: 10,
            connect_timeout_secs: 5,
            default_expire_secs: 60,
            fail_open: false,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration for `url` with default settings.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns the backend selected by the URL scheme.
    pub fn backend(&self) -> CacheResult<BackendKind> {
        BackendKind::from_url(&self.url)
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the default expiry as a Duration.
    #[must_use]
    pub const fn default_expire(&self) -> Duration {
        Duration::from_secs(self.default_expire_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,
    /// Metrics endpoint path.
    pub metrics_path: String,
    /// Log output settings.
    pub logging: TelemetryConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            logging: TelemetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(BackendKind::from_url("redis://localhost:6379/0").unwrap(), BackendKind::Redis);
        assert_eq!(BackendKind::from_url("rediss://cache.internal:6380").unwrap(), BackendKind::Redis);
        assert_eq!(BackendKind::from_url("memory://").unwrap(), BackendKind::Memory);
    }

    #[test]
    fn test_backend_rejects_unknown_scheme() {
        let err = BackendKind::from_url("memcached://localhost:11211").unwrap_err();
        assert!(err.to_string().contains("memcached"));
    }

    #[test]
    fn test_backend_rejects_garbage() {
        assert!(matches!(
            BackendKind::from_url("not a url"),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_cache_config_durations() {
        let config = CacheConfig::default();
        assert_eq!(config.default_expire(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert!(!config.fail_open);
    }

    #[test]
    fn test_cache_config_partial_deserialize() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"url":"memory://","namespace":"shop"}"#).unwrap();
        assert_eq!(config.namespace, "shop");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.backend().unwrap(), BackendKind::Memory);
    }
}
