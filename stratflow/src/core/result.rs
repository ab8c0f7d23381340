//! The value a step function returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name used when a scalar result is normalized into a mapping.
pub const RESULT_FIELD: &str = "result";

/// The value returned by a step function.
///
/// Output mapping always works against a mapping, so a `Scalar` is
/// normalized to `{"result": value}` before outputs are extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepResult {
    /// A structured, string-keyed result.
    Mapping(Map<String, Value>),
    /// Any other JSON value (string, number, bool, null, sequence).
    Scalar(Value),
}

impl StepResult {
    /// Creates a result from a mapping.
    #[must_use]
    pub const fn mapping(values: Map<String, Value>) -> Self {
        Self::Mapping(values)
    }

    /// Creates a scalar result.
    #[must_use]
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::from_value(value.into())
    }

    /// Classifies an arbitrary JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            other => Self::Scalar(other),
        }
    }

    /// Returns true if the result is a mapping.
    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Returns the result as it was returned, without wrapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Mapping(map) => Value::Object(map.clone()),
            Self::Scalar(value) => value.clone(),
        }
    }

    /// Normalizes the result into a mapping.
    #[must_use]
    pub fn normalize(&self) -> Map<String, Value> {
        match self {
            Self::Mapping(map) => map.clone(),
            Self::Scalar(value) => {
                let mut map = Map::new();
                map.insert(RESULT_FIELD.to_string(), value.clone());
                map
            }
        }
    }
}

impl From<Value> for StepResult {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for StepResult {
    fn from(values: Map<String, Value>) -> Self {
        Self::Mapping(values)
    }
}

impl From<&str> for StepResult {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::String(value.to_string()))
    }
}

impl From<bool> for StepResult {
    fn from(value: bool) -> Self {
        Self::Scalar(Value::Bool(value))
    }
}
