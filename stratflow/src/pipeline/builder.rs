//! Pipeline builder with validation.

use super::{Pipeline, StrategyDefinition};
use crate::config::{CyclePolicy, EngineConfig};
use crate::errors::{ConfigError, CycleDetectedError, IssueCollector, StratflowError};
use crate::evaluator::StepEvaluator;
use crate::events::{EventSink, NoOpEventSink};
use crate::functions::FunctionRegistry;
use crate::registry::{StepRegistry, StepTemplate};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds validated pipelines from strategy definitions.
///
/// Every template is checked and bound to its function here, so a built
/// [`Pipeline`] never meets a configuration error at run time.
pub struct PipelineBuilder<'a> {
    steps: &'a StepRegistry,
    functions: &'a FunctionRegistry,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for PipelineBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("steps", &self.steps.len())
            .field("functions", &self.functions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> PipelineBuilder<'a> {
    /// Creates a builder over a step registry and a function registry.
    #[must_use]
    pub fn new(steps: &'a StepRegistry, functions: &'a FunctionRegistry) -> Self {
        Self {
            steps,
            functions,
            config: EngineConfig::default(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sink built pipelines emit events to.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds a pipeline for a strategy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the strategy is empty, names unknown or
    /// duplicate steps, overrides parameters its templates do not map, or
    /// has unknown or cyclic `reevaluates` links. Returns `NotFoundError`
    /// or `SignatureMismatchError` if a step cannot be bound.
    pub fn build(&self, strategy: &StrategyDefinition) -> Result<Pipeline, StratflowError> {
        let templates = self.resolve_templates(strategy)?;

        if let Some(cycle) = detect_cycle(&templates) {
            let err = CycleDetectedError::new(cycle);
            match self.config.cycle_policy {
                CyclePolicy::Reject => return Err(ConfigError::from(err).into()),
                CyclePolicy::Bounded => warn!(
                    strategy = %strategy.name,
                    cycle = %err.cycle_path.join(" -> "),
                    limit = self.config.max_reevaluation_passes,
                    "Accepting cyclic reevaluates links"
                ),
            }
        }

        let steps = templates
            .into_iter()
            .map(|template| StepEvaluator::bind_with(template, self.functions, self.config.strict_signatures))
            .collect::<Result<Vec<_>, _>>()?;

        info!(strategy = %strategy.name, steps = steps.len(), "Built pipeline");

        Ok(Pipeline::new(
            strategy.name.clone(),
            steps,
            self.config.clone(),
            Arc::clone(&self.sink),
        ))
    }

    /// Builds a pipeline running every registry step in registry order.
    ///
    /// # Errors
    ///
    /// Same as [`PipelineBuilder::build`].
    pub fn build_registry(&self, name: impl Into<String>) -> Result<Pipeline, StratflowError> {
        let strategy = self
            .steps
            .ids()
            .iter()
            .fold(StrategyDefinition::new(name), |strategy, id| {
                strategy.with_step(super::StrategyStepSpec::new(id.clone()))
            });
        self.build(&strategy)
    }

    /// Applies overrides and validates links, collecting every problem.
    fn resolve_templates(&self, strategy: &StrategyDefinition) -> Result<Vec<StepTemplate>, ConfigError> {
        let mut issues = IssueCollector::new();
        let mut templates: Vec<StepTemplate> = Vec::with_capacity(strategy.steps.len());

        if strategy.steps.is_empty() {
            issues.push(
                "PIPELINE-005-EMPTY",
                None,
                format!("Strategy '{}' has no steps", strategy.name),
            );
        }

        // Pass 1: resolve registry steps and apply overrides.
        for spec in &strategy.steps {
            let id = spec.id();

            if templates.iter().any(|t| t.id() == id) {
                issues.push(
                    "PIPELINE-002-DUPLICATE_STEP",
                    Some(id),
                    format!("Step '{id}' appears more than once"),
                );
                continue;
            }

            let Ok(template) = self.steps.get(id) else {
                issues.push(
                    "PIPELINE-001-UNKNOWN_STEP",
                    Some(id),
                    format!("Step '{id}' is not in the step registry"),
                );
                continue;
            };

            for param in spec.static_config.keys() {
                if !template.static_config().contains_key(param) {
                    issues.push(
                        "PIPELINE-003-INVALID_OVERRIDE",
                        Some(id),
                        format!("Step '{id}' has no static parameter '{param}' to override"),
                    );
                }
            }
            for param in spec.dynamic_config.keys() {
                if !template.context_inputs().contains_key(param) {
                    issues.push(
                        "PIPELINE-003-INVALID_OVERRIDE",
                        Some(id),
                        format!("Step '{id}' has no context input '{param}' to override"),
                    );
                }
            }

            let reevaluates: Vec<String> = spec.reevaluates.iter().map(|r| r.trim().to_string()).collect();
            let mut merged = template.overridden(&spec.static_config, &spec.dynamic_config, &reevaluates);
            if let Some(description) = &spec.description {
                merged = merged.with_description(description.clone());
            }
            merged.validate_into(&mut issues);
            templates.push(merged);
        }

        // Pass 2: every link must stay inside the strategy.
        let ids: HashSet<&str> = templates.iter().map(StepTemplate::id).collect();
        for template in &templates {
            for target in template.reevaluates() {
                if target != template.id() && !ids.contains(target.as_str()) {
                    issues.push(
                        "PIPELINE-006-UNKNOWN_REEVALUATES",
                        Some(template.id()),
                        format!(
                            "Step '{}' reevaluates '{target}', which is not part of strategy '{}'",
                            template.id(),
                            strategy.name
                        ),
                    );
                }
            }
        }

        issues.finish(&format!("Invalid strategy '{}'", strategy.name))?;
        Ok(templates)
    }
}

/// Finds a cycle among `reevaluates` links, if any.
fn detect_cycle(templates: &[StepTemplate]) -> Option<Vec<String>> {
    let edges: HashMap<&str, &[String]> = templates
        .iter()
        .map(|t| (t.id(), t.reevaluates()))
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for template in templates {
        if !visited.contains(template.id()) {
            if let Some(cycle) = dfs_cycle(template.id(), &edges, &mut visited, &mut rec_stack, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle<'t>(
    node: &'t str,
    edges: &HashMap<&'t str, &'t [String]>,
    visited: &mut HashSet<&'t str>,
    rec_stack: &mut HashSet<&'t str>,
    path: &mut Vec<&'t str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(targets) = edges.get(node) {
        for target in targets.iter() {
            let target = target.as_str();
            if !visited.contains(target) {
                if let Some(cycle) = dfs_cycle(target, edges, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(target) {
                let start = path.iter().position(|n| *n == target).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| (*n).to_string()).collect();
                cycle.push(target.to_string());
                return Some(cycle);
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use crate::core::StepResult;
    use crate::functions::FunctionSignature;
    use crate::pipeline::StrategyStepSpec;
    use pretty_assertions::assert_eq;

    const REGISTRY: &str = r#"
[steps.a]
function = "test.a"
static_config = { window = 5 }
context_inputs = { seed = "seed" }
context_outputs = { "_" = "a_out" }

[steps.b]
function = "test.b"
context_outputs = { "_" = "b_out" }

[steps.c]
function = "test.c"
context_outputs = { "_" = "c_out" }
"#;

    fn registries() -> (StepRegistry, FunctionRegistry) {
        let steps = StepRegistry::load(REGISTRY, ConfigFormat::Toml).unwrap();
        let functions = FunctionRegistry::new();
        functions
            .register_fn(
                "test.a",
                FunctionSignature::new().required("seed").optional("window", 5),
                |_, _| Ok(StepResult::scalar(1)),
            )
            .unwrap();
        for name in ["test.b", "test.c"] {
            functions
                .register_fn(name, FunctionSignature::new(), |_, _| Ok(StepResult::scalar(1)))
                .unwrap();
        }
        (steps, functions)
    }

    fn strategy(specs: Vec<StrategyStepSpec>) -> StrategyDefinition {
        specs
            .into_iter()
            .fold(StrategyDefinition::new("test"), StrategyDefinition::with_step)
    }

    fn config_error(result: Result<Pipeline, StratflowError>) -> ConfigError {
        match result {
            Err(StratflowError::Config(err)) => err,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_success() {
        let (steps, functions) = registries();
        let pipeline = PipelineBuilder::new(&steps, &functions)
            .build(&strategy(vec![
                StrategyStepSpec::new("a").with_static("window", 10),
                StrategyStepSpec::new("b").with_reevaluates("a"),
            ]))
            .unwrap();

        assert_eq!(pipeline.name(), "test");
        assert_eq!(pipeline.step_ids(), vec!["a", "b"]);
        let a = pipeline.step("a").unwrap().template();
        assert_eq!(a.static_config().get("window"), Some(&serde_json::json!(10)));
        assert_eq!(
            pipeline.step("b").unwrap().template().reevaluates(),
            &["a".to_string()]
        );
    }

    #[test]
    fn test_build_registry_uses_every_step() {
        let (steps, functions) = registries();
        let pipeline = PipelineBuilder::new(&steps, &functions)
            .build_registry("all")
            .unwrap();
        assert_eq!(pipeline.step_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_strategy() {
        let (steps, functions) = registries();
        let err = config_error(PipelineBuilder::new(&steps, &functions).build(&strategy(vec![])));
        assert_eq!(err.code(), Some("PIPELINE-005-EMPTY"));
    }

    #[test]
    fn test_unknown_and_duplicate_steps_are_collected() {
        let (steps, functions) = registries();
        let err = config_error(PipelineBuilder::new(&steps, &functions).build(&strategy(vec![
            StrategyStepSpec::new("ghost"),
            StrategyStepSpec::new("b"),
            StrategyStepSpec::new("b"),
        ])));

        assert_eq!(err.code(), Some("PIPELINE-001-UNKNOWN_STEP"));
        assert_eq!(err.issues.len(), 2);
        assert!(err.issues[1].contains("more than once"));
    }

    #[test]
    fn test_override_must_name_mapped_parameter() {
        let (steps, functions) = registries();
        let err = config_error(PipelineBuilder::new(&steps, &functions).build(&strategy(vec![
            StrategyStepSpec::new("a")
                .with_static("frame_size", 20)
                .with_dynamic("trend", "trend"),
        ])));

        assert_eq!(err.code(), Some("PIPELINE-003-INVALID_OVERRIDE"));
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_reevaluates_must_stay_in_strategy() {
        let (steps, functions) = registries();
        let err = config_error(PipelineBuilder::new(&steps, &functions).build(&strategy(vec![
            StrategyStepSpec::new("b").with_reevaluates("c"),
        ])));
        assert_eq!(err.code(), Some("PIPELINE-006-UNKNOWN_REEVALUATES"));
    }

    #[test]
    fn test_self_reevaluation_is_rejected() {
        let (steps, functions) = registries();
        let err = config_error(PipelineBuilder::new(&steps, &functions).build(&strategy(vec![
            StrategyStepSpec::new("b").with_reevaluates("b"),
        ])));
        assert_eq!(err.code(), Some("REGISTRY-006-SELF_REEVALUATES"));
    }

    #[test]
    fn test_cycle_is_rejected_by_default() {
        let (steps, functions) = registries();
        let err = config_error(PipelineBuilder::new(&steps, &functions).build(&strategy(vec![
            StrategyStepSpec::new("b").with_reevaluates("c"),
            StrategyStepSpec::new("c").with_reevaluates("b"),
        ])));

        assert_eq!(err.code(), Some("PIPELINE-004-CYCLE"));
        assert_eq!(err.steps, vec!["b", "c", "b"]);
    }

    #[test]
    fn test_cycle_is_accepted_when_bounded() {
        let (steps, functions) = registries();
        let pipeline = PipelineBuilder::new(&steps, &functions)
            .with_config(EngineConfig::new().with_cycle_policy(CyclePolicy::Bounded))
            .build(&strategy(vec![
                StrategyStepSpec::new("b").with_reevaluates("c"),
                StrategyStepSpec::new("c").with_reevaluates("b"),
            ]))
            .unwrap();
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_detect_cycle_through_longer_path() {
        let reference = crate::functions::FunctionRef::parse("test.x").unwrap();
        let templates = vec![
            StepTemplate::new("a", reference.clone()).with_reevaluates("b"),
            StepTemplate::new("b", reference.clone()).with_reevaluates("c"),
            StepTemplate::new("c", reference.clone()).with_reevaluates("a"),
            StepTemplate::new("d", reference).with_reevaluates("a"),
        ];
        assert_eq!(
            detect_cycle(&templates),
            Some(vec!["a".into(), "b".into(), "c".into(), "a".into()])
        );
        assert_eq!(detect_cycle(&templates[3..]), None);
    }

    #[test]
    fn test_bind_errors_surface() {
        let (steps, _) = registries();
        let functions = FunctionRegistry::new();
        let result = PipelineBuilder::new(&steps, &functions)
            .build(&strategy(vec![StrategyStepSpec::new("b")]));
        assert!(matches!(result, Err(StratflowError::NotFound(_))));
    }
}
