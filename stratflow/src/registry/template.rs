//! Immutable step templates.

use crate::context::{ContextPath, DIRECT_VALUE};
use crate::errors::IssueCollector;
use crate::functions::FunctionRef;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Declarative description of one step.
///
/// A template says which function to call, which literal parameters to
/// pass (`static_config`), which parameters to read from the context
/// (`context_inputs`, parameter -> context path), where to store result
/// fields (`context_outputs`, result path -> context key, with `_` for the
/// whole return value) and which earlier steps to re-validate after it
/// runs (`reevaluates`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTemplate {
    id: String,
    function_ref: FunctionRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    static_config: Map<String, Value>,
    context_inputs: BTreeMap<String, String>,
    context_outputs: BTreeMap<String, String>,
    reevaluates: Vec<String>,
}

impl StepTemplate {
    /// Creates a template with no parameters or outputs.
    #[must_use]
    pub fn new(id: impl Into<String>, function_ref: FunctionRef) -> Self {
        Self {
            id: id.into(),
            function_ref,
            description: None,
            static_config: Map::new(),
            context_inputs: BTreeMap::new(),
            context_outputs: BTreeMap::new(),
            reevaluates: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets a literal parameter.
    #[must_use]
    pub fn with_static(mut self, param: impl Into<String>, value: impl Into<Value>) -> Self {
        self.static_config.insert(param.into(), value.into());
        self
    }

    /// Maps a parameter to a context path.
    #[must_use]
    pub fn with_input(mut self, param: impl Into<String>, path: impl Into<String>) -> Self {
        self.context_inputs.insert(param.into(), path.into());
        self
    }

    /// Maps a result path to a context key.
    #[must_use]
    pub fn with_output(mut self, result_path: impl Into<String>, context_key: impl Into<String>) -> Self {
        self.context_outputs
            .insert(result_path.into(), context_key.into());
        self
    }

    /// Adds a step to re-validate after this one runs.
    #[must_use]
    pub fn with_reevaluates(mut self, step_id: impl Into<String>) -> Self {
        let step_id = step_id.into();
        if !self.reevaluates.contains(&step_id) {
            self.reevaluates.push(step_id);
        }
        self
    }

    /// Returns the step id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the function reference.
    #[must_use]
    pub const fn function_ref(&self) -> &FunctionRef {
        &self.function_ref
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the literal parameters.
    #[must_use]
    pub const fn static_config(&self) -> &Map<String, Value> {
        &self.static_config
    }

    /// Returns parameter -> context path mappings.
    #[must_use]
    pub const fn context_inputs(&self) -> &BTreeMap<String, String> {
        &self.context_inputs
    }

    /// Returns result path -> context key mappings.
    #[must_use]
    pub const fn context_outputs(&self) -> &BTreeMap<String, String> {
        &self.context_outputs
    }

    /// Returns the ids this step reevaluates, in declaration order.
    #[must_use]
    pub fn reevaluates(&self) -> &[String] {
        &self.reevaluates
    }

    /// Returns every parameter name the template supplies.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self
            .static_config
            .keys()
            .chain(self.context_inputs.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names.into_iter()
    }

    /// Checks the template's own fields, recording problems in `issues`.
    pub(crate) fn validate_into(&self, issues: &mut IssueCollector) {
        let step = Some(self.id.as_str());

        if self.id.trim().is_empty() {
            issues.push("REGISTRY-001-MISSING_FIELD", None, "Step id must not be empty");
        }

        for (param, path) in &self.context_inputs {
            if param.trim().is_empty() {
                issues.push(
                    "REGISTRY-001-MISSING_FIELD",
                    step,
                    format!("Step '{}' maps a context input to an empty parameter name", self.id),
                );
            }
            if ContextPath::parse(path).is_err() {
                issues.push(
                    "REGISTRY-005-INVALID_PATH",
                    step,
                    format!("Step '{}' input '{param}' has invalid context path '{path}'", self.id),
                );
            }
        }

        for (result_path, context_key) in &self.context_outputs {
            if result_path != DIRECT_VALUE && ContextPath::parse(result_path).is_err() {
                issues.push(
                    "REGISTRY-005-INVALID_PATH",
                    step,
                    format!("Step '{}' has invalid result path '{result_path}'", self.id),
                );
            }
            if ContextPath::parse(context_key).is_err() {
                issues.push(
                    "REGISTRY-005-INVALID_PATH",
                    step,
                    format!(
                        "Step '{}' output '{result_path}' has invalid context key '{context_key}'",
                        self.id
                    ),
                );
            }
        }

        if self.reevaluates.iter().any(|id| id == &self.id) {
            issues.push(
                "REGISTRY-006-SELF_REEVALUATES",
                step,
                format!("Step '{}' reevaluates itself", self.id),
            );
        }
    }

    /// Returns a copy with strategy-level overrides applied.
    #[must_use]
    pub(crate) fn overridden(
        &self,
        static_config: &Map<String, Value>,
        dynamic_config: &BTreeMap<String, String>,
        reevaluates: &[String],
    ) -> Self {
        let mut merged = self.clone();
        for (param, value) in static_config {
            merged.static_config.insert(param.clone(), value.clone());
        }
        for (param, path) in dynamic_config {
            merged.context_inputs.insert(param.clone(), path.clone());
        }
        for id in reevaluates {
            merged = merged.with_reevaluates(id.clone());
        }
        merged
    }
}
