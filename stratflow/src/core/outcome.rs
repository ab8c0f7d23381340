//! Per-attempt step outcome.

use super::{ErrorKind, StepStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The result of one step evaluation attempt.
///
/// Outcomes are values: failures inside a step never escape as errors,
/// they are reported to the runner through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Every declared output was extracted and stored.
    Success {
        /// Context key -> stored value, for each declared output.
        values: Map<String, Value>,
        /// The function's return value before normalization.
        raw_result: Value,
    },
    /// The step could not produce its outputs.
    Failure {
        /// Failure category.
        kind: ErrorKind,
        /// Human-readable diagnosis.
        detail: String,
    },
}

impl StepOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub const fn success(values: Map<String, Value>, raw_result: Value) -> Self {
        Self::Success { values, raw_result }
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns true if the outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if the outcome is a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Returns the step status this outcome settles into.
    #[must_use]
    pub const fn status(&self) -> StepStatus {
        match self {
            Self::Success { .. } => StepStatus::Passed,
            Self::Failure { .. } => StepStatus::Failed,
        }
    }

    /// Returns the stored values of a success.
    #[must_use]
    pub const fn values(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Success { values, .. } => Some(values),
            Self::Failure { .. } => None,
        }
    }

    /// Returns a single stored value of a success.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values().and_then(|values| values.get(key))
    }

    /// Returns the raw result of a success.
    #[must_use]
    pub const fn raw_result(&self) -> Option<&Value> {
        match self {
            Self::Success { raw_result, .. } => Some(raw_result),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Returns the failure detail.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { detail, .. } => Some(detail),
        }
    }
}
