//! Configuration loader with layered sources.

use crate::AppConfig;
use cachet_core::CacheError;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "CACHET";

/// Configuration loader with runtime reload support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides, not committed
    /// 4. Environment variables with `CACHET_` prefix, `__` between sections
    ///    (e.g. `CACHET_CACHE__URL`)
    pub fn new(config_dir: impl Into<String>) -> Result<Self, CacheError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, CacheError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<AppConfig, CacheError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("CACHET_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_cache_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_cache_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration.
    fn validate_config(config: &AppConfig) -> Result<(), CacheError> {
        if config.cache.url.is_empty() {
            return Err(CacheError::configuration("Cache URL is required"));
        }

        config.cache.backend()?;

        if config.cache.pool_size == 0 {
            return Err(CacheError::configuration("Cache pool size must be at least 1"));
        }

        if config.cache.namespace.is_empty() {
            warn!("Cache namespace is empty; keys will share the backend keyspace unscoped");
        }

        if config.app.environment == "production" && config.cache.fail_open {
            warn!("Cache fail_open is enabled in production; backend outages will be masked");
        }

        Ok(())
    }
}

fn config_error_to_cache_error(err: ConfigError) -> CacheError {
    CacheError::Configuration(err.to_string())
}
