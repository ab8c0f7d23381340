//! Step status and failure kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a step within one run.
///
/// A step moves `Pending -> Running -> {Passed, Failed}` and may go back to
/// `Running` only when a later step reevaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not evaluated yet in this run.
    #[default]
    Pending,
    /// Currently being evaluated.
    Running,
    /// Most recent evaluation succeeded.
    Passed,
    /// Most recent evaluation failed.
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StepStatus {
    /// Returns true if the status represents a settled evaluation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Why a step evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An input could not be resolved from the context.
    MissingContextKey,
    /// The result did not provide a declared output.
    OutputMapping,
    /// The step function returned an error or panicked.
    Evaluation,
    /// Reevaluation passes exceeded the configured bound.
    ReevaluationLimitExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContextKey => write!(f, "missing_context_key"),
            Self::OutputMapping => write!(f, "output_mapping"),
            Self::Evaluation => write!(f, "evaluation"),
            Self::ReevaluationLimitExceeded => write!(f, "reevaluation_limit_exceeded"),
        }
    }
}

impl ErrorKind {
    /// Returns true if a later step may still make this failure go away.
    ///
    /// Missing inputs and function errors are recoverable: a later step can
    /// supply the input or change the context the function sees. Output
    /// mapping failures and an exhausted pass limit are not.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingContextKey | Self::Evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_display() {
        assert_eq!(StepStatus::Pending.to_string(), "pending");
        assert_eq!(StepStatus::Running.to_string(), "running");
        assert_eq!(StepStatus::Passed.to_string(), "passed");
        assert_eq!(StepStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_step_status_is_terminal() {
        assert!(StepStatus::Passed.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
    }

    #[test]
    fn test_step_status_serialize() {
        let json = serde_json::to_string(&StepStatus::Passed).unwrap();
        assert_eq!(json, r#""passed""#);

        let deserialized: StepStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StepStatus::Passed);
    }

    #[test]
    fn test_error_kind_recoverable() {
        assert!(ErrorKind::MissingContextKey.is_recoverable());
        assert!(!ErrorKind::OutputMapping.is_recoverable());
        assert!(ErrorKind::Evaluation.is_recoverable());
        assert!(!ErrorKind::ReevaluationLimitExceeded.is_recoverable());
    }

    #[test]
    fn test_error_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::MissingContextKey).unwrap();
        assert_eq!(json, r#""missing_context_key""#);
        assert_eq!(ErrorKind::OutputMapping.to_string(), "output_mapping");
    }
}
