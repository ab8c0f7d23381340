//! Run reports.

use crate::context::ExecutionContext;
use crate::core::{ErrorKind, StepStatus};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step's latest outcome passed.
    Completed,
    /// A step failed with no remaining reevaluation opportunity.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Final state of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// The step id.
    pub id: String,
    /// Status after the run.
    pub status: StepStatus,
    /// Number of evaluations in this run.
    pub attempts: u32,
}

/// One re-run triggered through a `reevaluates` link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReevaluationRecord {
    /// The step whose pass triggered the re-run.
    pub trigger: String,
    /// The step that was re-run.
    pub target: String,
    /// Attempt number of the re-run.
    pub attempt: u32,
    /// Status the re-run ended in.
    pub status: StepStatus,
}

impl fmt::Display for ReevaluationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (attempt {}, {})",
            self.trigger, self.target, self.attempt, self.status
        )
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Step '{step_id}' failed ({kind}): {detail}")]
pub struct RunFailure {
    /// The failing step.
    pub step_id: String,
    /// The failure kind.
    pub kind: ErrorKind,
    /// Failure detail.
    pub detail: String,
    /// Reevaluations attempted before the failure, formatted.
    pub chain: Vec<String>,
}

/// Everything a caller learns from one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Name of the pipeline that ran.
    pub pipeline: String,
    /// Run id taken from the context's identity.
    pub run_id: String,
    /// Terminal status.
    pub status: RunStatus,
    /// Per-step final states, in declaration order.
    pub steps: Vec<StepReport>,
    /// Reevaluations performed, in order.
    pub reevaluations: Vec<ReevaluationRecord>,
    /// Set when the run failed.
    pub failure: Option<RunFailure>,
    /// Reevaluation passes consumed.
    pub passes: usize,
    /// Wall-clock duration.
    pub duration_ms: f64,
    /// The context as the run left it.
    pub context: ExecutionContext,
}

impl RunReport {
    /// Returns true if the run completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Returns a step's final report.
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Returns a step's final status; unknown steps are `Pending`.
    #[must_use]
    pub fn step_status(&self, id: &str) -> StepStatus {
        self.step(id).map_or(StepStatus::Pending, |step| step.status)
    }

    /// Returns the run failure as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the `RunFailure` if the run failed.
    pub fn into_result(self) -> Result<ExecutionContext, RunFailure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.context),
        }
    }

    /// Serializes the report without the full context history.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "pipeline": self.pipeline,
            "run_id": self.run_id,
            "status": self.status,
            "steps": self.steps,
            "reevaluations": self.reevaluations,
            "failure": self.failure,
            "passes": self.passes,
            "duration_ms": self.duration_ms,
            "context": self.context.snapshot(),
        })
    }
}
