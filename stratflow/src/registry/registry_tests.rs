//! Tests for registry loading.

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

const REGISTRY_TOML: &str = r#"
[steps.detect_trend]
function = "technical.trend.detect_trend"
description = "Detect the prevailing trend"
context_outputs = { "_" = "trend" }

[steps.find_extreme]
pure_function = "technical.extreme.find_extreme"
input_params_map = { trend = "trend" }
config_mapping = { frame_size = 20 }
return_map = { is_extreme = "is_extreme", extreme_bar_index = "extreme_bar_index" }
reevaluates = ["detect_trend"]
unknown_key = "ignored"

[steps.detect_wrb]
function_ref = "technical.wrb.detect_wide_range_bar"
static_config = { lookback_bars = 20, comparison_method = "max" }
context_outputs = { is_wide_range = "wrb.active" }
"#;

#[test]
fn test_load_toml_registry() {
    let registry = StepRegistry::load(REGISTRY_TOML, ConfigFormat::Toml).unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(
        registry.ids(),
        &["detect_trend".to_string(), "find_extreme".to_string(), "detect_wrb".to_string()]
    );

    let find_extreme = registry.get("find_extreme").unwrap();
    assert_eq!(
        find_extreme.function_ref().as_str(),
        "technical.extreme.find_extreme"
    );
    assert_eq!(find_extreme.static_config().get("frame_size"), Some(&json!(20)));
    assert_eq!(
        find_extreme.context_inputs().get("trend").map(String::as_str),
        Some("trend")
    );
    assert_eq!(find_extreme.reevaluates(), &["detect_trend".to_string()]);

    let detect_trend = registry.get("detect_trend").unwrap();
    assert_eq!(detect_trend.description(), Some("Detect the prevailing trend"));
    assert_eq!(
        detect_trend.context_outputs().get("_").map(String::as_str),
        Some("trend")
    );
}

#[test]
fn test_load_json_registry() {
    let source = json!({
        "steps": {
            "detect_trend": {
                "function": "technical.trend.detect_trend",
                "context_outputs": {"_": "trend"}
            }
        }
    })
    .to_string();

    let registry = StepRegistry::load(&source, ConfigFormat::Json).unwrap();
    assert!(registry.contains("detect_trend"));
    assert_eq!(registry.iter().count(), 1);
}

#[test]
fn test_get_unknown_step() {
    let registry = StepRegistry::load(REGISTRY_TOML, ConfigFormat::Toml).unwrap();
    assert_eq!(
        registry.get("missing").unwrap_err(),
        NotFoundError::step("missing")
    );
}

#[test]
fn test_unknown_reevaluates_fails_collectively() {
    let source = r#"
[steps.a]
function = "mod.a"
reevaluates = ["ghost_one"]

[steps.b]
function = "mod.b"
reevaluates = ["a", "ghost_two"]
"#;

    let err = StepRegistry::load(source, ConfigFormat::Toml).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-003-UNKNOWN_REEVALUATES"));
    assert_eq!(err.issues.len(), 2);
    assert!(err.issues[0].contains("ghost_one"));
    assert!(err.issues[1].contains("ghost_two"));
    assert_eq!(err.steps, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_missing_function_is_rejected() {
    let source = r#"
[steps.a]
function = "   "

[steps.b]
context_outputs = { "_" = "b" }
"#;

    let err = StepRegistry::load(source, ConfigFormat::Toml).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-001-MISSING_FIELD"));
    assert_eq!(err.issues.len(), 2);
}

#[test]
fn test_blank_id_is_rejected() {
    let source = json!({"steps": {"  ": {"function": "mod.fn"}}}).to_string();
    let err = StepRegistry::load(&source, ConfigFormat::Json).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-001-MISSING_FIELD"));
}

#[test]
fn test_malformed_function_ref() {
    let source = json!({"steps": {"a": {"function": "detect_trend"}}}).to_string();
    let err = StepRegistry::load(&source, ConfigFormat::Json).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-004-FUNCTION_REF"));
}

#[test]
fn test_duplicate_id_is_rejected() {
    let source = r#"{"steps": {"a": {"function": "mod.a"}, "a": {"function": "mod.b"}}}"#;
    let err = StepRegistry::load(source, ConfigFormat::Json).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-002-DUPLICATE_ID"));
}

#[test]
fn test_duplicate_template_is_rejected() {
    let reference = FunctionRef::parse("mod.a").unwrap();
    let err = StepRegistry::from_templates(vec![
        StepTemplate::new("a", reference.clone()),
        StepTemplate::new("a", reference),
    ])
    .unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-002-DUPLICATE_ID"));
}

#[test]
fn test_self_reevaluation_is_rejected() {
    let source = r#"
[steps.a]
function = "mod.a"
reevaluates = ["a"]
"#;
    let err = StepRegistry::load(source, ConfigFormat::Toml).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-006-SELF_REEVALUATES"));
    assert_eq!(err.issues.len(), 1);
}

#[test]
fn test_invalid_paths_are_rejected() {
    let source = r#"
[steps.a]
function = "mod.a"
context_inputs = { trend = "" }
"#;
    let err = StepRegistry::load(source, ConfigFormat::Toml).unwrap_err();
    assert_eq!(err.code(), Some("REGISTRY-005-INVALID_PATH"));
}

#[test]
fn test_empty_document() {
    let registry = StepRegistry::load("", ConfigFormat::Toml).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_load_from_path() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(REGISTRY_TOML.as_bytes()).unwrap();

    let registry = StepRegistry::from_path(file.path()).unwrap();
    assert_eq!(registry.len(), 3);

    let missing = StepRegistry::from_path("/nonexistent/steps.toml");
    assert!(matches!(missing, Err(StratflowError::Io(_))));
}

#[test]
fn test_return_map_reads_result_path_first() {
    let source = r#"
[steps.detect_trend]
function = "technical.trend.detect_trend"
return_map = { "_" = "trend" }
"#;
    let registry = StepRegistry::load(source, ConfigFormat::Toml).unwrap();
    let outputs = registry.get("detect_trend").unwrap().context_outputs();
    assert_eq!(outputs.get("_").map(String::as_str), Some("trend"));
    assert!(outputs.get("trend").is_none());
}
