//! Strategy definitions.

use crate::config::{read_document, ConfigFormat};
use crate::errors::{ConfigError, StratflowError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// One step of a strategy: a registry step plus per-strategy overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStepSpec {
    /// Id of the registry step this entry runs.
    pub system_step_id: String,
    /// Optional description replacing the template's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Static parameter overrides.
    #[serde(default, alias = "config_mapping")]
    pub static_config: Map<String, Value>,
    /// Dynamic parameter overrides: parameter name to context path.
    #[serde(default, alias = "input_params_map")]
    pub dynamic_config: BTreeMap<String, String>,
    /// Strategy steps to reevaluate after this one passes.
    #[serde(default)]
    pub reevaluates: Vec<String>,
}

impl StrategyStepSpec {
    /// Creates an entry with no overrides.
    #[must_use]
    pub fn new(system_step_id: impl Into<String>) -> Self {
        Self {
            system_step_id: system_step_id.into(),
            description: None,
            static_config: Map::new(),
            dynamic_config: BTreeMap::new(),
            reevaluates: Vec::new(),
        }
    }

    /// Overrides a static parameter.
    #[must_use]
    pub fn with_static(mut self, param: impl Into<String>, value: impl Into<Value>) -> Self {
        self.static_config.insert(param.into(), value.into());
        self
    }

    /// Overrides the context path of a dynamic parameter.
    #[must_use]
    pub fn with_dynamic(mut self, param: impl Into<String>, path: impl Into<String>) -> Self {
        self.dynamic_config.insert(param.into(), path.into());
        self
    }

    /// Adds a reevaluation target.
    #[must_use]
    pub fn with_reevaluates(mut self, step_id: impl Into<String>) -> Self {
        self.reevaluates.push(step_id.into());
        self
    }

    /// Returns the step id within the strategy.
    #[must_use]
    pub fn id(&self) -> &str {
        self.system_step_id.trim()
    }
}

/// An ordered list of steps forming one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    /// Strategy name.
    pub name: String,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StrategyStepSpec>,
}

impl StrategyDefinition {
    /// Creates an empty strategy.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn with_step(mut self, step: StrategyStepSpec) -> Self {
        self.steps.push(step);
        self
    }

    /// Parses a strategy document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is malformed.
    pub fn parse(source: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        format.parse(source)
    }

    /// Loads a strategy from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StratflowError> {
        read_document(path.as_ref())
    }

    /// Returns the step ids in order.
    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(StrategyStepSpec::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_toml_strategy() {
        let source = r#"
name = "trend_follow"

[[steps]]
system_step_id = "detect_trend"
static_config = { frame_size = 30 }

[[steps]]
system_step_id = "find_extreme"
input_params_map = { trend = "analysis.trend" }
reevaluates = ["detect_trend"]
"#;
        let strategy = StrategyDefinition::parse(source, ConfigFormat::Toml).unwrap();

        assert_eq!(strategy.name, "trend_follow");
        assert_eq!(
            strategy.step_ids().collect::<Vec<_>>(),
            vec!["detect_trend", "find_extreme"]
        );
        assert_eq!(strategy.steps[0].static_config.get("frame_size"), Some(&json!(30)));
        assert_eq!(
            strategy.steps[1].dynamic_config.get("trend").map(String::as_str),
            Some("analysis.trend")
        );
        assert_eq!(strategy.steps[1].reevaluates, vec!["detect_trend".to_string()]);
    }

    #[test]
    fn test_parse_json_strategy() {
        let source = json!({
            "name": "wrb",
            "steps": [{"system_step_id": "detect_wrb", "description": "Wide range bars"}]
        })
        .to_string();
        let strategy = StrategyDefinition::parse(&source, ConfigFormat::Json).unwrap();
        assert_eq!(strategy.steps[0].description.as_deref(), Some("Wide range bars"));
        assert!(strategy.steps[0].reevaluates.is_empty());
    }

    #[test]
    fn test_builder_methods() {
        let strategy = StrategyDefinition::new("manual").with_step(
            StrategyStepSpec::new(" find_extreme ")
                .with_static("frame_size", 10)
                .with_dynamic("trend", "trend")
                .with_reevaluates("detect_trend"),
        );
        assert_eq!(strategy.steps[0].id(), "find_extreme");
        assert_eq!(strategy.steps[0].reevaluates.len(), 1);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = StrategyDefinition::parse("steps = []", ConfigFormat::Toml).unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-001-PARSE"));
    }
}
