//! Tests for `StepOutcome`.

use super::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn values(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn test_success_accessors() {
    let outcome = StepOutcome::success(
        values(&[("is_extreme", json!(true)), ("extreme_bar_index", json!(42))]),
        json!({"is_extreme": true, "extreme_bar_index": 42, "extreme_price": 101.5}),
    );

    assert!(outcome.is_success());
    assert!(!outcome.is_failure());
    assert_eq!(outcome.status(), StepStatus::Passed);
    assert_eq!(outcome.get("extreme_bar_index"), Some(&json!(42)));
    assert_eq!(outcome.get("extreme_price"), None);
    assert_eq!(outcome.kind(), None);
    assert_eq!(outcome.detail(), None);
}

#[test]
fn test_failure_accessors() {
    let outcome = StepOutcome::failure(ErrorKind::MissingContextKey, "Context key 'trend' not found");

    assert!(outcome.is_failure());
    assert_eq!(outcome.status(), StepStatus::Failed);
    assert_eq!(outcome.kind(), Some(ErrorKind::MissingContextKey));
    assert_eq!(outcome.detail(), Some("Context key 'trend' not found"));
    assert!(outcome.values().is_none());
    assert!(outcome.raw_result().is_none());
}

#[test]
fn test_outcome_serialization() {
    let outcome = StepOutcome::failure(ErrorKind::Evaluation, "boom");
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(
        json,
        json!({"status": "failure", "kind": "evaluation", "detail": "boom"})
    );

    let back: StepOutcome = serde_json::from_value(json).unwrap();
    assert_eq!(back, outcome);
}

#[test]
fn test_success_serialization_keeps_falsy_values() {
    let outcome = StepOutcome::success(
        values(&[("flag", json!(false)), ("count", json!(0)), ("items", json!([]))]),
        Value::Null,
    );
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["status"], json!("success"));
    assert_eq!(json["values"]["flag"], json!(false));
    assert_eq!(json["values"]["count"], json!(0));
    assert_eq!(json["values"]["items"], json!([]));
}
