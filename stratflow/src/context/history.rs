//! Outcome history entries.

use crate::core::StepOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded evaluation attempt of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// The evaluated step.
    pub step_id: String,
    /// 1 for the first evaluation in a run, incremented per reevaluation.
    pub attempt: u32,
    /// What the attempt produced.
    pub outcome: StepOutcome,
    /// Fingerprint of the resolved dynamic inputs, if they all resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fingerprint: Option<String>,
    /// Timestamp of the bar the step was evaluated against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_timestamp: Option<DateTime<Utc>>,
    /// Wall-clock time the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    /// Returns true if this attempt was a reevaluation.
    #[must_use]
    pub const fn is_reevaluation(&self) -> bool {
        self.attempt > 1
    }
}
