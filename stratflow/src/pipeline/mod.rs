//! Pipeline building and execution.
//!
//! This module provides:
//! - Strategy definitions: ordered registry steps with overrides
//! - A builder that validates a strategy and binds every step
//! - The runner, which executes steps in order and reevaluates earlier
//!   steps through `reevaluates` links
//! - Run reports

mod builder;
mod report;
mod runner;
mod spec;

pub use builder::PipelineBuilder;
pub use report::{ReevaluationRecord, RunFailure, RunReport, RunStatus, StepReport};
pub use runner::Pipeline;
pub use spec::{StrategyDefinition, StrategyStepSpec};
