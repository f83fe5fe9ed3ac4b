//! Structured logging configuration.
//!
//! This module configures `tracing-subscriber` for either JSON output or
//! human-readable text.
//!
//! # Log Format
//!
//! When JSON formatting is enabled, log entries are output as JSON objects:
//!
//! ```json
//! {"timestamp":"2024-01-15T10:30:00.000Z","level":"WARN","target":"ledgerline_client::transport","fields":{"message":"request failed","status":422}}
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Whether to use JSON format (true) or text format (false)
    pub json_format: bool,
    /// The default log level if RUST_LOG is not set
    pub default_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    /// Builds a logging configuration from the `logging` config section.
    ///
    /// Unknown levels fall back to INFO; `ClientConfig::validate` rejects
    /// them before this point.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let default_level = settings.level.parse::<Level>().unwrap_or(Level::INFO);
        Self {
            json_format: settings.json,
            default_level,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }
}

/// Initialize the logging subsystem with the given configuration.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// If a global subscriber is already set, this call has no effect.
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    if config.json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        );

        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        );

        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
