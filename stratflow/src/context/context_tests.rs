//! Comprehensive tests for context module.

#[cfg(test)]
mod tests {
    use crate::context::{ContextPath, ExecutionContext, RunIdentity};
    use crate::core::{ErrorKind, StepOutcome};
    use crate::errors::ContextWriteError;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map, Value};

    #[test]
    fn test_run_identity_creation() {
        let identity = RunIdentity::for_symbol("EURUSD");
        assert_eq!(identity.symbol.as_deref(), Some("EURUSD"));

        let dict = identity.to_dict();
        assert!(dict.contains_key("run_id"));
        assert_eq!(dict.get("symbol"), Some(&json!("EURUSD")));
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunIdentity::new().run_id, RunIdentity::new().run_id);
    }

    #[test]
    fn test_store_and_resolve_round_trip() {
        let samples = vec![
            json!(0),
            json!(false),
            json!(""),
            json!([]),
            json!({}),
            Value::Null,
            json!({"nested": [1, 2, {"x": 1.5}]}),
        ];

        for value in samples {
            let mut ctx = ExecutionContext::new();
            ctx.store("a.b.c", value.clone()).unwrap();
            assert_eq!(ctx.resolve("a.b.c").unwrap(), &value);
        }
    }

    #[test]
    fn test_absent_is_distinct_from_null() {
        let ctx = ExecutionContext::new()
            .with_value("present", Value::Null)
            .unwrap();

        assert!(ctx.contains("present"));
        assert!(!ctx.contains("absent"));

        let err = ctx.resolve("absent").unwrap_err();
        assert_eq!(err.path, "absent");
        assert_eq!(err.segment, "absent");
    }

    #[test]
    fn test_store_creates_intermediate_maps() {
        let mut ctx = ExecutionContext::new();
        ctx.store("analysis.direction", json!("UP")).unwrap();
        ctx.store("analysis.strength", json!(0.7)).unwrap();

        assert_eq!(
            ctx.snapshot(),
            json!({"analysis": {"direction": "UP", "strength": 0.7}})
        );
    }

    #[test]
    fn test_store_overwrites() {
        let mut ctx = ExecutionContext::new();
        ctx.store("trend", json!("UP")).unwrap();
        ctx.store("trend", json!("DOWN")).unwrap();

        assert_eq!(ctx.resolve("trend").unwrap(), &json!("DOWN"));
        assert_eq!(ctx.values().len(), 1);
    }

    #[test]
    fn test_store_through_scalar_conflicts() {
        let mut ctx = ExecutionContext::new();
        ctx.store("trend", json!("UP")).unwrap();

        let err = ctx.store("trend.strength", json!(1)).unwrap_err();
        assert_eq!(
            err,
            ContextWriteError::PathConflict {
                path: "trend.strength".to_string(),
                segment: "trend".to_string(),
            }
        );
        assert_eq!(ctx.resolve("trend").unwrap(), &json!("UP"));
    }

    #[test]
    fn test_store_all_is_all_or_nothing() {
        let a = ContextPath::parse("x").unwrap();
        let b = ContextPath::parse("x.y").unwrap();

        let mut ctx = ExecutionContext::new();
        let err = ctx
            .store_all([(&a, json!(1)), (&b, json!(2))])
            .unwrap_err();
        assert_eq!(err.path(), "x.y");
        assert!(ctx.values().is_empty());

        let c = ContextPath::parse("analysis.direction").unwrap();
        ctx.store_all([(&a, json!(1)), (&c, json!("UP"))]).unwrap();
        assert_eq!(ctx.resolve("x").unwrap(), &json!(1));
        assert_eq!(ctx.resolve("analysis.direction").unwrap(), &json!("UP"));
    }

    #[test]
    fn test_segments_are_trimmed() {
        let mut ctx = ExecutionContext::new();
        ctx.store("analysis. direction ", json!("UP")).unwrap();
        assert_eq!(ctx.resolve("analysis.direction").unwrap(), &json!("UP"));
    }

    #[test]
    fn test_invalid_paths() {
        let mut ctx = ExecutionContext::new();
        assert!(matches!(
            ctx.store("", json!(1)),
            Err(ContextWriteError::InvalidPath { .. })
        ));
        assert!(ctx.resolve("a..b").is_err());
    }

    #[test]
    fn test_record_outcome_tracks_attempts() {
        let mut ctx = ExecutionContext::new();

        let first = ctx.record_outcome(
            "detect_trend",
            StepOutcome::failure(ErrorKind::MissingContextKey, "no bars"),
        );
        let second = ctx.record_outcome(
            "detect_trend",
            StepOutcome::success(Map::new(), json!("UP")),
        );
        ctx.record_outcome("find_extreme", StepOutcome::success(Map::new(), json!({})));

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(ctx.attempts("detect_trend"), 2);
        assert_eq!(ctx.attempts("unknown"), 0);
        assert_eq!(ctx.history().len(), 3);
        assert_eq!(ctx.history_for("detect_trend").count(), 2);

        let latest = ctx.latest_outcome("detect_trend").unwrap();
        assert!(latest.is_success());
        assert!(ctx.latest_record("detect_trend").unwrap().is_reevaluation());
        assert!(ctx.latest_outcome("missing").is_none());
    }

    #[test]
    fn test_into_values() {
        let ctx = ExecutionContext::new()
            .with_value("trend", json!("UP"))
            .unwrap();
        let values = ctx.into_values();
        assert_eq!(values.get("trend"), Some(&json!("UP")));
    }
}
