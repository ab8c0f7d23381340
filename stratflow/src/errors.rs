//! Error types for the stratflow engine.
//!
//! Load-time and bind-time errors (`ConfigError`, `NotFoundError`,
//! `SignatureMismatchError`, `CycleDetectedError`) abort before any market
//! data flows. Evaluation-time errors are captured per step and surface as
//! [`StepOutcome::Failure`](crate::core::StepOutcome) values instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for stratflow operations.
#[derive(Debug, Error)]
pub enum StratflowError {
    /// A registry, strategy or engine configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A step or function lookup failed.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// A step template does not fit the function it is bound to.
    #[error("{0}")]
    SignatureMismatch(#[from] SignatureMismatchError),

    /// A context path could not be traversed.
    #[error("{0}")]
    MissingContextKey(#[from] MissingContextKeyError),

    /// A context write was rejected.
    #[error("{0}")]
    ContextWrite(#[from] ContextWriteError),

    /// A step result did not match its declared outputs.
    #[error("{0}")]
    OutputMapping(#[from] OutputMappingError),

    /// A step function failed.
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),

    /// Reevaluation did not converge.
    #[error("{0}")]
    ReevaluationLimit(#[from] ReevaluationLimitExceeded),

    /// A cycle was detected among `reevaluates` links.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata about a configuration error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-004-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Error raised when a registry, strategy or engine configuration is invalid.
///
/// Validation collects every problem it finds, so `issues` may hold more
/// than one entry.
#[derive(Debug, Clone, Error)]
#[error("{message}{}", format_issues(.issues))]
pub struct ConfigError {
    /// The error message.
    pub message: String,
    /// Individual problems found during validation.
    pub issues: Vec<String>,
    /// The step ids involved in the error.
    pub steps: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

fn format_issues(issues: &[String]) -> String {
    if issues.is_empty() {
        String::new()
    } else {
        format!(": {}", issues.join("; "))
    }
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issues: Vec::new(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the individual issues.
    #[must_use]
    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = issues;
        self
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

impl From<CycleDetectedError> for ConfigError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            issues: Vec::new(),
            steps: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Collects validation problems so a whole document is checked in one pass.
#[derive(Debug, Default)]
pub(crate) struct IssueCollector {
    issues: Vec<(&'static str, String)>,
    steps: Vec<String>,
}

impl IssueCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records an issue under a contract code, optionally naming a step.
    pub(crate) fn push(&mut self, code: &'static str, step: Option<&str>, issue: impl Into<String>) {
        if let Some(step) = step {
            if !self.steps.iter().any(|s| s == step) {
                self.steps.push(step.to_string());
            }
        }
        self.issues.push((code, issue.into()));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `Ok(())` when nothing was collected.
    ///
    /// The first issue's code becomes the error's contract code.
    pub(crate) fn finish(self, message: &str) -> Result<(), ConfigError> {
        let Some(&(code, ref first)) = self.issues.first() else {
            return Ok(());
        };

        let mut info = ContractErrorInfo::new(code, first.clone());
        if let Some(hint) = ContractSuggestions::get(code) {
            info = info.with_fix_hint(hint);
        }

        Err(ConfigError::new(message)
            .with_issues(self.issues.into_iter().map(|(_, issue)| issue).collect())
            .with_steps(self.steps)
            .with_error_info(info))
    }
}

/// Error raised when a step template or function is not registered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} '{id}' not found")]
pub struct NotFoundError {
    /// What was looked up ("step", "function").
    pub kind: String,
    /// The id that was looked up.
    pub id: String,
}

impl NotFoundError {
    /// Creates a not-found error for a step template.
    #[must_use]
    pub fn step(id: impl Into<String>) -> Self {
        Self {
            kind: "step".to_string(),
            id: id.into(),
        }
    }

    /// Creates a not-found error for a step function.
    #[must_use]
    pub fn function(id: impl Into<String>) -> Self {
        Self {
            kind: "function".to_string(),
            id: id.into(),
        }
    }
}

/// Error raised when a template's parameters do not fit its function.
#[derive(Debug, Clone, Error)]
#[error(
    "Signature mismatch for step '{step_id}' ({function}): {}",
    describe_mismatch(.missing, .uncovered)
)]
pub struct SignatureMismatchError {
    /// The step being bound.
    pub step_id: String,
    /// The function reference.
    pub function: String,
    /// Parameters mapped by the template that the function does not declare.
    pub missing: Vec<String>,
    /// Required function parameters the template does not supply.
    pub uncovered: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

fn describe_mismatch(missing: &[String], uncovered: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("function does not accept [{}]", missing.join(", ")));
    }
    if !uncovered.is_empty() {
        parts.push(format!("required parameters not supplied [{}]", uncovered.join(", ")));
    }
    parts.join("; ")
}

impl SignatureMismatchError {
    /// Creates a new signature mismatch error.
    #[must_use]
    pub fn new(
        step_id: impl Into<String>,
        function: impl Into<String>,
        missing: Vec<String>,
        uncovered: Vec<String>,
    ) -> Self {
        let step_id = step_id.into();
        let info = ContractErrorInfo::new(
            "BIND-001-SIGNATURE",
            format!("Step '{step_id}' does not match its function signature"),
        )
        .with_fix_hint(
            "Align the step's static/dynamic parameter names with the function's declared parameters.",
        )
        .with_context_entry("step", step_id.clone());

        Self {
            step_id,
            function: function.into(),
            missing,
            uncovered,
            error_info: info,
        }
    }
}

/// Error raised when a dotted context path cannot be traversed.
///
/// A key holding `null` is present; only absent keys raise this error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Context key '{path}' not found (missing segment '{segment}')")]
pub struct MissingContextKeyError {
    /// The full path being resolved.
    pub path: String,
    /// The first segment that could not be followed.
    pub segment: String,
}

impl MissingContextKeyError {
    /// Creates a new missing context key error.
    #[must_use]
    pub fn new(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            segment: segment.into(),
        }
    }
}

/// Errors raised when writing into the context namespace.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextWriteError {
    /// The path is empty or has an empty segment.
    #[error("Invalid context path '{path}'")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// An intermediate segment holds a value that is not a mapping.
    #[error("Cannot write '{path}': segment '{segment}' holds a non-mapping value")]
    PathConflict {
        /// The path being written.
        path: String,
        /// The conflicting segment.
        segment: String,
    },
}

impl ContextWriteError {
    /// Returns the path that could not be written.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::InvalidPath { path } | Self::PathConflict { path, .. } => path,
        }
    }
}

/// Error raised when a step result cannot satisfy its declared outputs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Output mapping failed for step '{step_id}' at '{path}': {reason}")]
pub struct OutputMappingError {
    /// The step whose outputs were being mapped.
    pub step_id: String,
    /// The result path or context key that failed.
    pub path: String,
    /// Why the mapping failed.
    pub reason: String,
}

impl OutputMappingError {
    /// Creates a new output mapping error.
    #[must_use]
    pub fn new(
        step_id: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a step function fails or panics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Step '{step_id}' failed: {message}")]
pub struct EvaluationError {
    /// The failing step.
    pub step_id: String,
    /// The function's error message.
    pub message: String,
}

impl EvaluationError {
    /// Creates a new evaluation error.
    #[must_use]
    pub fn new(step_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            message: message.into(),
        }
    }
}

/// Error raised when reevaluation passes exceed the configured bound.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Reevaluation limit of {limit} passes exceeded: {}", chain.join(" -> "))]
pub struct ReevaluationLimitExceeded {
    /// The configured limit.
    pub limit: usize,
    /// The reevaluated step ids, oldest first.
    pub chain: Vec<String>,
}

impl ReevaluationLimitExceeded {
    /// Creates a new reevaluation limit error.
    #[must_use]
    pub fn new(limit: usize, chain: Vec<String>) -> Self {
        Self { limit, chain }
    }
}

/// Error raised when `reevaluates` links form a cycle.
#[derive(Debug, Clone, Error)]
#[error("Reevaluation cycle detected: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of steps forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            "PIPELINE-004-CYCLE",
            format!("Steps reevaluate each other: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint(
            "Remove one of the reevaluates links, or set cycle_policy = \"bounded\" if the oscillation is intended.",
        );

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

/// Errors a step function returns to the evaluator.
///
/// Whatever the variant, the evaluator reports it as an evaluation failure
/// of the calling step.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StepFunctionError {
    /// A declared parameter was not supplied.
    #[error("Missing argument '{0}'")]
    MissingArgument(String),

    /// A parameter had the wrong shape or value.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// The parameter name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Not enough bars to compute the result.
    #[error("Insufficient data: required {required} bars, available {available}")]
    InsufficientData {
        /// Bars required.
        required: usize,
        /// Bars available.
        available: usize,
    },

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl StepFunctionError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a generic failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Provides default suggestions for common configuration error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "REGISTRY-001-MISSING_FIELD" => Some(
                "Every step needs a non-empty id and a function reference such as 'technical.trend.detect_trend'.",
            ),
            "REGISTRY-002-DUPLICATE_ID" => Some(
                "Step ids must be unique. Rename one of the duplicated steps.",
            ),
            "REGISTRY-003-UNKNOWN_REEVALUATES" => Some(
                "Every id listed in 'reevaluates' must name a step that exists. Check for typos.",
            ),
            "REGISTRY-004-FUNCTION_REF" => Some(
                "Use a dotted path such as 'technical.trend.detect_trend'.",
            ),
            "REGISTRY-005-INVALID_PATH" => Some(
                "Context paths are dot-separated keys with no empty segments, e.g. 'analysis.direction'.",
            ),
            "REGISTRY-006-SELF_REEVALUATES" => Some(
                "A step cannot reevaluate itself. Remove its own id from 'reevaluates'.",
            ),
            "PIPELINE-001-UNKNOWN_STEP" => Some(
                "Every 'system_step_id' must name a step in the step registry.",
            ),
            "PIPELINE-002-DUPLICATE_STEP" => Some(
                "A step can appear only once in a strategy.",
            ),
            "PIPELINE-003-INVALID_OVERRIDE" => Some(
                "Strategy overrides may only set parameters the step template already maps.",
            ),
            "PIPELINE-004-CYCLE" => Some(
                "Check your reevaluates links for circular references.",
            ),
            "PIPELINE-005-EMPTY" => Some("Add at least one step to the strategy."),
            "PIPELINE-006-UNKNOWN_REEVALUATES" => Some(
                "Every id listed in 'reevaluates' must be a step of the same strategy.",
            ),
            "BIND-001-SIGNATURE" => Some(
                "The step maps parameters its function does not declare, or leaves a required parameter unset.",
            ),
            _ => None,
        }
    }
}
