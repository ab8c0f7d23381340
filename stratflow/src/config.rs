//! Engine configuration and document formats.

use crate::errors::{ConfigError, ContractErrorInfo, StratflowError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default bound on reevaluation passes per run.
pub const DEFAULT_MAX_REEVALUATION_PASSES: usize = 10;

/// Text formats configuration documents can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFormat {
    /// TOML document.
    Toml,
    /// JSON document.
    Json,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => write!(f, "toml"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl ConfigFormat {
    /// Picks a format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Parses a document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` with the parser's message on malformed input.
    pub fn parse<T: DeserializeOwned>(self, source: &str) -> Result<T, ConfigError> {
        let parsed = match self {
            Self::Toml => toml::from_str(source).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(source).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| {
            ConfigError::new(format!("Failed to parse {self} document"))
                .with_issues(vec![message])
                .with_error_info(ContractErrorInfo::new(
                    "CONFIG-001-PARSE",
                    "The configuration document is not well formed",
                ))
        })
    }
}

/// Reads a document from disk, choosing the format by extension.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read, or `ConfigError` if the
/// extension is unknown or the document is malformed.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, StratflowError> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        ConfigError::new(format!(
            "Cannot infer configuration format of '{}'",
            path.display()
        ))
        .with_error_info(
            ContractErrorInfo::new("CONFIG-002-FORMAT", "Unknown configuration file extension")
                .with_fix_hint("Use a .toml or .json file."),
        )
    })?;
    let source = std::fs::read_to_string(path)?;
    Ok(format.parse(&source)?)
}

/// What pipeline building does with cyclic `reevaluates` links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Reject the pipeline.
    #[default]
    Reject,
    /// Accept it and rely on the reevaluation pass bound.
    Bounded,
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Bounded => write!(f, "bounded"),
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum reevaluation re-runs per pipeline run.
    pub max_reevaluation_passes: usize,
    /// Handling of cyclic `reevaluates` links.
    pub cycle_policy: CyclePolicy,
    /// Reject templates that map parameters their function does not declare.
    pub strict_signatures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reevaluation_passes: DEFAULT_MAX_REEVALUATION_PASSES,
            cycle_policy: CyclePolicy::Reject,
            strict_signatures: true,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reevaluation pass bound.
    #[must_use]
    pub fn with_max_reevaluation_passes(mut self, passes: usize) -> Self {
        self.max_reevaluation_passes = passes;
        self
    }

    /// Sets the cycle policy.
    #[must_use]
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Sets signature strictness.
    #[must_use]
    pub fn with_strict_signatures(mut self, strict: bool) -> Self {
        self.strict_signatures = strict;
        self
    }

    /// Parses an engine configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on malformed input.
    pub fn parse(source: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        format.parse(source)
    }

    /// Loads an engine configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StratflowError> {
        read_document(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_reevaluation_passes, 10);
        assert_eq!(config.cycle_policy, CyclePolicy::Reject);
        assert!(config.strict_signatures);
    }

    #[test]
    fn test_engine_config_partial_toml() {
        let config = EngineConfig::parse(
            "cycle_policy = \"bounded\"\nmax_reevaluation_passes = 3\n",
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.cycle_policy, CyclePolicy::Bounded);
        assert_eq!(config.max_reevaluation_passes, 3);
        assert!(config.strict_signatures);
    }

    #[test]
    fn test_engine_config_json() {
        let config =
            EngineConfig::parse(r#"{"strict_signatures": false}"#, ConfigFormat::Json).unwrap();
        assert!(!config.strict_signatures);
    }

    #[test]
    fn test_malformed_document() {
        let err = EngineConfig::parse("cycle_policy = [", ConfigFormat::Toml).unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-001-PARSE"));
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("steps.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("steps.JSON")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("steps.yaml")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("steps")), None);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_reevaluation_passes = 4").unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.max_reevaluation_passes, 4);

        let unknown = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            EngineConfig::from_path(unknown.path()),
            Err(StratflowError::Config(_))
        ));
    }
}
