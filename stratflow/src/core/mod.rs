//! Core domain model types for stratflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Step status and failure kind enums
//! - The per-attempt step outcome
//! - The normalized step function result

mod outcome;
#[cfg(test)]
mod outcome_tests;
mod result;
mod status;

pub use outcome::StepOutcome;
pub use result::{StepResult, RESULT_FIELD};
pub use status::{ErrorKind, StepStatus};
