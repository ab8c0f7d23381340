//! Event sinks for pipeline lifecycle events.
//!
//! A [`Pipeline`](crate::pipeline::Pipeline) emits one event per step
//! transition. Event types:
//!
//! - `step.started`, `step.passed`, `step.failed`
//! - `step.reevaluated`, `step.skipped_reevaluation`
//! - `pipeline.completed`, `pipeline.failed`

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type emitted when a step starts evaluating.
pub const STEP_STARTED: &str = "step.started";
/// Event type emitted when a step passes.
pub const STEP_PASSED: &str = "step.passed";
/// Event type emitted when a step fails.
pub const STEP_FAILED: &str = "step.failed";
/// Event type emitted when a step is re-run by a later step.
pub const STEP_REEVALUATED: &str = "step.reevaluated";
/// Event type emitted when a reevaluation target is still valid.
pub const STEP_SKIPPED_REEVALUATION: &str = "step.skipped_reevaluation";
/// Event type emitted when a run completes.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Event type emitted when a run fails.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
