//! Configuration management for the Ledgerline client.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use ledgerline_client::config::ClientConfig;
//!
//! // Load from file with env overrides
//! let config = ClientConfig::load("ledgerline.yaml")?;
//!
//! // Or load from environment only
//! let config = ClientConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use ledgerline_domain::ResponseCacheConfig;
use serde::{Deserialize, Serialize};

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ClientConfig {
    /// API endpoint settings
    #[serde(default)]
    pub api: ApiSettings,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Failure notification settings
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// API endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ApiSettings {
    /// Base URL that relative request URLs resolve against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// IANA timezone sent as `X-Client-TZ`; falls back to `TZ`, then UTC
    pub timezone: Option<String>,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds (0 = none)
    #[serde(default)]
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timezone: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: 0,
        }
    }
}

impl ApiSettings {
    /// Timezone to report to the API.
    pub fn resolved_timezone(&self) -> String {
        self.timezone
            .as_deref()
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var("TZ")
                    .ok()
                    .map(|tz| tz.trim().trim_start_matches(':').to_string())
                    .filter(|tz| !tz.is_empty())
            })
            .unwrap_or_else(|| "UTC".to_string())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    /// Serve and store deduplicated reads from the cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Freshness window in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,

    /// Maximum number of cached responses
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_cache_ttl_ms(),
            max_capacity: default_cache_capacity(),
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> ResponseCacheConfig {
        ResponseCacheConfig::default()
            .with_enabled(self.enabled)
            .with_ttl(Duration::from_millis(self.ttl_ms))
            .with_max_capacity(self.max_capacity)
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_ms() -> u64 {
    4000
}

fn default_cache_capacity() -> u64 {
    10_000
}

/// Failure notification settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NotificationSettings {
    /// How long error notifications stay visible, in milliseconds
    #[serde(default = "default_error_duration_ms")]
    pub error_duration_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            error_duration_ms: default_error_duration_ms(),
        }
    }
}

impl NotificationSettings {
    pub fn error_duration(&self) -> Duration {
        Duration::from_millis(self.error_duration_ms)
    }
}

fn default_error_duration_ms() -> u64 {
    6000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ClientConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `LEDGERLINE_` and use `__` as
    /// separator. For example:
    /// - `LEDGERLINE_API__BASE_URL=...` overrides `api.base_url`
    /// - `LEDGERLINE_CACHE__TTL_MS=1000` overrides `cache.ttl_ms`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ClientConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let client_config: ClientConfig = config.try_deserialize()?;
        client_config.validate()?;

        Ok(client_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ClientConfig::default())?)
            .add_source(env_source())
            .build()?;

        let client_config: ClientConfig = config.try_deserialize()?;
        client_config.validate()?;

        Ok(client_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match reqwest::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigLoadError::Invalid {
                    message: format!(
                        "api.base_url must use http or https, got: {}",
                        url.scheme()
                    ),
                });
            }
            Err(e) => {
                return Err(ConfigLoadError::Invalid {
                    message: format!("api.base_url is not a valid URL: {e}"),
                });
            }
        }

        if self.cache.enabled && self.cache.ttl_ms == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "cache.ttl_ms must be greater than 0 when caching is enabled"
                    .to_string(),
            });
        }

        if self.cache.max_capacity == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "cache.max_capacity must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

/// Environment source: `LEDGERLINE_SECTION__KEY` -> `section.key`.
fn env_source() -> Environment {
    Environment::with_prefix("LEDGERLINE")
        .prefix_separator("_")
        .separator("__")
}
