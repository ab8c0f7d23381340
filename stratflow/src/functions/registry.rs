//! Function references and the function registry.

use super::{FnStepFunction, FunctionSignature, StepArgs, StepFunction};
use crate::core::StepResult;
use crate::errors::{ConfigError, ContractErrorInfo, NotFoundError, StepFunctionError};
use crate::market::MarketData;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

const FUNCTION_REF_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$";

fn function_ref_pattern() -> Result<&'static Regex, ConfigError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(FUNCTION_REF_PATTERN))
        .as_ref()
        .map_err(|e| ConfigError::new(format!("Invalid function reference pattern: {e}")))
}

/// A `module.path.symbol` reference to a step function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionRef(String);

impl FunctionRef {
    /// Parses a function reference.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` unless the reference is a dotted path of at
    /// least two identifiers.
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        let trimmed = reference.trim();
        if function_ref_pattern()?.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ConfigError::new(format!(
                "Invalid function reference '{reference}'"
            ))
            .with_error_info(
                ContractErrorInfo::new(
                    "REGISTRY-004-FUNCTION_REF",
                    "Function references must look like 'module.function'",
                )
                .with_fix_hint("Use a dotted path such as 'technical.trend.detect_trend'."),
            ))
        }
    }

    /// Returns the full reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the module path.
    #[must_use]
    pub fn module(&self) -> &str {
        self.0.rsplit_once('.').map_or("", |(module, _)| module)
    }

    /// Returns the symbol name.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, symbol)| symbol)
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FunctionRef {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FunctionRef> for String {
    fn from(reference: FunctionRef) -> Self {
        reference.0
    }
}

/// Registry of step functions keyed by reference.
///
/// Resolution happens once, when a pipeline is built, so a missing
/// function is reported before any market data flows.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<BTreeMap<FunctionRef, Arc<dyn StepFunction>>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, replacing any previous one with the same
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the reference is malformed.
    pub fn register(
        &self,
        reference: &str,
        function: Arc<dyn StepFunction>,
    ) -> Result<(), ConfigError> {
        let reference = FunctionRef::parse(reference)?;
        tracing::debug!(function = %reference, "Registered step function");
        self.functions.write().insert(reference, function);
        Ok(())
    }

    /// Registers a closure as a function.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the reference is malformed.
    pub fn register_fn<F>(
        &self,
        reference: &str,
        signature: FunctionSignature,
        func: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&MarketData, &StepArgs) -> Result<StepResult, StepFunctionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(reference, Arc::new(FnStepFunction::new(signature, func)))
    }

    /// Resolves a function.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError` if nothing is registered under the reference.
    pub fn resolve(&self, reference: &FunctionRef) -> Result<Arc<dyn StepFunction>, NotFoundError> {
        self.functions
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| NotFoundError::function(reference.as_str()))
    }

    /// Returns true if a function is registered under the reference.
    #[must_use]
    pub fn contains(&self, reference: &FunctionRef) -> bool {
        self.functions.read().contains_key(reference)
    }

    /// Returns the registered references in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.functions
            .read()
            .keys()
            .map(|r| r.as_str().to_string())
            .collect()
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Returns true if no functions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::MockStepFunction;

    #[test]
    fn test_function_ref_parse() {
        let reference = FunctionRef::parse("technical.trend.detect_trend").unwrap();
        assert_eq!(reference.module(), "technical.trend");
        assert_eq!(reference.symbol(), "detect_trend");
        assert_eq!(reference.to_string(), "technical.trend.detect_trend");
    }

    #[test]
    fn test_function_ref_rejects_bare_names() {
        for bad in ["", "   ", "detect_trend", "technical.", ".trend", "a..b", "1mod.fn", "a.b-c"] {
            let err = FunctionRef::parse(bad).unwrap_err();
            assert_eq!(err.code(), Some("REGISTRY-004-FUNCTION_REF"), "{bad}");
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = FunctionRegistry::new();
        registry
            .register_fn(
                "technical.trend.detect_trend",
                FunctionSignature::new(),
                |_, _| Ok(StepResult::scalar("UP")),
            )
            .unwrap();

        let reference = FunctionRef::parse("technical.trend.detect_trend").unwrap();
        assert!(registry.contains(&reference));
        assert_eq!(registry.len(), 1);

        let function = registry.resolve(&reference).unwrap();
        let result = function
            .call(&MarketData::default(), &StepArgs::default())
            .unwrap();
        assert_eq!(result, StepResult::scalar("UP"));
    }

    #[test]
    fn test_resolve_missing() {
        let registry = FunctionRegistry::new();
        let reference = FunctionRef::parse("technical.missing.fn").unwrap();
        let err = registry.resolve(&reference).err().unwrap();
        assert_eq!(err, NotFoundError::function("technical.missing.fn"));
    }

    #[test]
    fn test_register_mock() {
        let mut mock = MockStepFunction::new();
        mock.expect_signature()
            .return_const(FunctionSignature::new().required("trend"));

        let registry = FunctionRegistry::new();
        registry.register("custom.mock", Arc::new(mock)).unwrap();

        let function = registry
            .resolve(&FunctionRef::parse("custom.mock").unwrap())
            .unwrap();
        assert!(function.signature().declares("trend"));
        assert!(registry.register("not-a-ref", Arc::new(MockStepFunction::new())).is_err());
    }
}
