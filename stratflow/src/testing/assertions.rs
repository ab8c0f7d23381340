//! Test assertions for run reports.

use crate::core::{ErrorKind, StepStatus};
use crate::pipeline::RunReport;
use serde_json::Value;

/// Asserts that a step's latest outcome passed.
pub fn assert_step_passed(report: &RunReport, step_id: &str) {
    let status = report.step_status(step_id);
    assert_eq!(
        status,
        StepStatus::Passed,
        "Expected step '{step_id}' to pass, got {status}; failure: {:?}",
        report.failure
    );
}

/// Asserts that a step's latest outcome failed with `kind`.
pub fn assert_step_failed(report: &RunReport, step_id: &str, kind: ErrorKind) {
    let status = report.step_status(step_id);
    assert_eq!(
        status,
        StepStatus::Failed,
        "Expected step '{step_id}' to fail, got {status}"
    );
    let actual = report
        .context
        .latest_outcome(step_id)
        .and_then(crate::core::StepOutcome::kind);
    assert_eq!(
        actual,
        Some(kind),
        "Expected step '{step_id}' to fail with {kind}, got {actual:?}"
    );
}

/// Asserts that a step never ran.
pub fn assert_step_pending(report: &RunReport, step_id: &str) {
    assert_eq!(report.step_status(step_id), StepStatus::Pending);
    assert_eq!(
        report.context.attempts(step_id),
        0,
        "Expected step '{step_id}' not to run"
    );
}

/// Asserts that the context holds `expected` at `path`.
pub fn assert_context_value(report: &RunReport, path: &str, expected: &Value) {
    match report.context.resolve(path) {
        Ok(actual) => assert_eq!(
            actual, expected,
            "Expected {expected} at '{path}', got {actual}"
        ),
        Err(err) => panic!("Expected {expected} at '{path}': {err}"),
    }
}
