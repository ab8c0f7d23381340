//! Price-action analysis functions.

pub mod extreme;
pub mod trend;
pub mod wrb;

pub use extreme::{find_extreme, FIND_EXTREME};
pub use trend::{detect_trend, Trend, DETECT_TREND};
pub use wrb::{detect_wide_range_bar, ComparisonMethod, WrbSeries, DETECT_WIDE_RANGE_BAR};

use crate::errors::ConfigError;
use crate::functions::FunctionRegistry;

/// Registers every technical function.
///
/// # Errors
///
/// Returns `ConfigError` if a reference is malformed.
pub fn register_builtins(functions: &FunctionRegistry) -> Result<(), ConfigError> {
    functions.register_fn(DETECT_TREND, trend::signature(), detect_trend)?;
    functions.register_fn(FIND_EXTREME, extreme::signature(), find_extreme)?;
    functions.register_fn(DETECT_WIDE_RANGE_BAR, wrb::signature(), detect_wide_range_bar)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use crate::context::ExecutionContext;
    use crate::pipeline::PipelineBuilder;
    use crate::registry::StepRegistry;
    use crate::testing::{assert_context_value, trending_bars};
    use serde_json::json;

    const REGISTRY: &str = r#"
[steps.detect_trend]
function = "technical.trend.detect_trend"
static_config = { frame_size = 5 }
context_outputs = { "_" = "trend" }

[steps.find_extreme]
function = "technical.extreme.find_extreme"
context_inputs = { trend = "trend" }
static_config = { frame_size = 5 }
context_outputs = { is_extreme = "is_extreme", extreme_bar_index = "extreme_bar_index" }

[steps.detect_wrb]
function = "technical.wrb.detect_wide_range_bar"
static_config = { lookback_bars = 3 }
context_outputs = { is_wide_range = "wrb.active" }
"#;

    #[test]
    fn test_register_builtins() {
        let functions = FunctionRegistry::new();
        register_builtins(&functions).unwrap();
        assert_eq!(functions.len(), 3);
        assert!(functions.contains(&crate::functions::FunctionRef::parse(FIND_EXTREME).unwrap()));
    }

    #[test]
    fn test_builtins_in_pipeline() {
        let steps = StepRegistry::load(REGISTRY, ConfigFormat::Toml).unwrap();
        let functions = FunctionRegistry::new();
        register_builtins(&functions).unwrap();

        let pipeline = PipelineBuilder::new(&steps, &functions)
            .build_registry("trend_follow")
            .unwrap();

        let report = pipeline.run(ExecutionContext::new(), &trending_bars(12, 1.0));
        assert!(report.is_success(), "{:?}", report.failure);
        assert_context_value(&report, "trend", &json!("UP"));
        assert_context_value(&report, "is_extreme", &json!(true));
        assert_context_value(&report, "extreme_bar_index", &json!(11));
        assert_context_value(&report, "wrb.active", &json!(false));
    }
}
