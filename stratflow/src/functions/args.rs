//! Merged arguments passed to a step function.

use crate::errors::StepFunctionError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Arguments for one step function call.
///
/// Built by the evaluator from the template's static config, the
/// resolved dynamic inputs and the signature's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepArgs {
    values: Map<String, Value>,
}

impl StepArgs {
    /// Creates arguments from a mapping.
    #[must_use]
    pub const fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Returns a raw argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a raw argument, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns `StepFunctionError::MissingArgument` if absent.
    pub fn require(&self, name: &str) -> Result<&Value, StepFunctionError> {
        self.values
            .get(name)
            .ok_or_else(|| StepFunctionError::MissingArgument(name.to_string()))
    }

    /// Returns a numeric argument.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a number.
    pub fn get_f64(&self, name: &str) -> Result<f64, StepFunctionError> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| StepFunctionError::invalid(name, "expected a number"))
    }

    /// Returns a non-negative integer argument.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a non-negative integer.
    pub fn get_u64(&self, name: &str) -> Result<u64, StepFunctionError> {
        self.require(name)?
            .as_u64()
            .ok_or_else(|| StepFunctionError::invalid(name, "expected a non-negative integer"))
    }

    /// Returns a count or size argument.
    ///
    /// # Errors
    ///
    /// Fails if absent, not a non-negative integer, or too large.
    pub fn get_usize(&self, name: &str) -> Result<usize, StepFunctionError> {
        let value = self.get_u64(name)?;
        usize::try_from(value).map_err(|_| StepFunctionError::invalid(name, "value too large"))
    }

    /// Returns a string argument.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a string.
    pub fn get_str(&self, name: &str) -> Result<&str, StepFunctionError> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| StepFunctionError::invalid(name, "expected a string"))
    }

    /// Returns a boolean argument.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, StepFunctionError> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| StepFunctionError::invalid(name, "expected a boolean"))
    }

    /// Deserializes an argument into any type.
    ///
    /// # Errors
    ///
    /// Fails if absent or if deserialization fails.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, StepFunctionError> {
        let value = self.require(name)?.clone();
        serde_json::from_value(value).map_err(|e| StepFunctionError::invalid(name, e.to_string()))
    }

    /// Returns true if the argument is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the underlying mapping.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for StepArgs {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<(String, Value)> for StepArgs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> StepArgs {
        [
            ("frame_size".to_string(), json!(20)),
            ("trend".to_string(), json!("UP")),
            ("min_size_increase_pct".to_string(), json!(0.5)),
            ("strict".to_string(), json!(false)),
            ("levels".to_string(), json!([1.0, 2.0])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_typed_getters() {
        let args = args();
        assert_eq!(args.get_usize("frame_size").unwrap(), 20);
        assert_eq!(args.get_str("trend").unwrap(), "UP");
        assert!((args.get_f64("min_size_increase_pct").unwrap() - 0.5).abs() < f64::EPSILON);
        assert!(!args.get_bool("strict").unwrap());
        assert_eq!(args.get_as::<Vec<f64>>("levels").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_missing_and_invalid() {
        let args = args();
        assert_eq!(
            args.get_str("missing"),
            Err(StepFunctionError::MissingArgument("missing".to_string()))
        );
        assert!(matches!(
            args.get_u64("trend"),
            Err(StepFunctionError::InvalidArgument { .. })
        ));
    }
}
