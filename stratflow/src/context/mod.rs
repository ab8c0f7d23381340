//! Context management for pipeline runs.
//!
//! This module provides:
//! - Dotted context paths with absent-vs-null resolution
//! - The mutable per-run execution context and its outcome history
//! - Run identity for correlating events

#[cfg(test)]
mod context_tests;
mod execution;
mod history;
mod identity;
mod path;

pub use execution::ExecutionContext;
pub use history::OutcomeRecord;
pub use identity::RunIdentity;
pub use path::{ContextPath, DIRECT_VALUE};
