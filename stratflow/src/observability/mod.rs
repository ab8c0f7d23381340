//! Logging setup.
//!
//! The engine logs through `tracing` macros only. Applications that want
//! those logs printed call [`init_tracing`] once at startup.

use crate::errors::{ConfigError, ContractErrorInfo};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when no filter applies.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// `EnvFilter` directive, e.g. `"stratflow=debug,info"`.
    ///
    /// Takes precedence over `RUST_LOG` and `level`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enables JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Sets an explicit filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Builds the filter: explicit directive, then `RUST_LOG`, then level.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the directive or level is not valid.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        let filter = match &self.filter {
            Some(directive) => EnvFilter::try_new(directive),
            None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.level)),
        };

        filter.map_err(|e| {
            ConfigError::new("Invalid logging filter")
                .with_issues(vec![e.to_string()])
                .with_error_info(
                    ContractErrorInfo::new("CONFIG-003-LOG_FILTER", "The log filter could not be parsed")
                        .with_fix_hint("Use a level such as 'info' or directives such as 'stratflow=debug,warn'."),
                )
        })
    }
}

/// Installs a global `tracing` subscriber.
///
/// # Errors
///
/// Returns `ConfigError` if the filter is invalid or a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let builder = tracing_subscriber::fmt().with_env_filter(config.env_filter()?);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| {
        ConfigError::new("Failed to install tracing subscriber").with_issues(vec![e.to_string()])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: LoggingConfig = ConfigFormat::Toml.parse("json = true").unwrap();
        assert!(config.json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_invalid_filter() {
        let err = LoggingConfig::new()
            .with_filter("stratflow=loud")
            .env_filter()
            .unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-003-LOG_FILTER"));
    }

    #[test]
    fn test_valid_filter() {
        assert!(LoggingConfig::new()
            .with_filter("stratflow=debug,warn")
            .env_filter()
            .is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::new().with_level("debug");
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
