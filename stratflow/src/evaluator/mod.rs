//! Binding and evaluating a single step.
//!
//! [`StepEvaluator::bind`] checks a template against its function's
//! signature once, before any data flows. [`StepEvaluator::evaluate`] then
//! resolves inputs, calls the function inside a failure boundary and maps
//! the result back into the context.

mod fingerprint;

pub use fingerprint::fingerprint_inputs;

use crate::context::{ContextPath, ExecutionContext};
use crate::core::{ErrorKind, StepOutcome, StepResult};
use crate::errors::{
    EvaluationError, MissingContextKeyError, OutputMappingError, SignatureMismatchError,
    StratflowError,
};
use crate::functions::{FunctionRegistry, StepArgs, StepFunction};
use crate::market::MarketData;
use crate::registry::StepTemplate;
use serde_json::{Map, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// The result of one evaluation together with its input fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// What the step produced.
    pub outcome: StepOutcome,
    /// Fingerprint of the resolved dynamic inputs; `None` if they did not
    /// all resolve.
    pub input_fingerprint: Option<String>,
}

#[derive(Debug, Clone)]
enum OutputSource {
    Direct,
    Field(ContextPath),
}

#[derive(Debug, Clone)]
struct OutputBinding {
    result_path: String,
    source: OutputSource,
    target: ContextPath,
}

/// A step template bound to its function.
pub struct StepEvaluator {
    template: StepTemplate,
    function: Arc<dyn StepFunction>,
    inputs: Vec<(String, ContextPath)>,
    outputs: Vec<OutputBinding>,
    strict: bool,
}

impl fmt::Debug for StepEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepEvaluator")
            .field("step", &self.template.id())
            .field("function", &self.template.function_ref().as_str())
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl StepEvaluator {
    /// Resolves the template's function and binds it strictly.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError` if the function is not registered, or
    /// `SignatureMismatchError` if the template does not fit it.
    pub fn bind(template: StepTemplate, functions: &FunctionRegistry) -> Result<Self, StratflowError> {
        Self::bind_with(template, functions, true)
    }

    /// Resolves the template's function and binds it.
    ///
    /// With `strict` off, template parameters the function does not
    /// declare are dropped from the call instead of rejected.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError` if the function is not registered, or
    /// `SignatureMismatchError` if the template does not fit it.
    pub fn bind_with(
        template: StepTemplate,
        functions: &FunctionRegistry,
        strict: bool,
    ) -> Result<Self, StratflowError> {
        let function = functions.resolve(template.function_ref())?;
        Self::bind_function(template, function, strict)
    }

    /// Binds a template to an already resolved function.
    ///
    /// # Errors
    ///
    /// Returns `SignatureMismatchError` if the template does not fit the
    /// function, or a path error if the template holds an invalid path.
    pub fn bind_function(
        template: StepTemplate,
        function: Arc<dyn StepFunction>,
        strict: bool,
    ) -> Result<Self, StratflowError> {
        let check = function.signature().check(template.parameter_names());
        if !check.uncovered.is_empty() || (strict && !check.undeclared.is_empty()) {
            return Err(SignatureMismatchError::new(
                template.id(),
                template.function_ref().as_str(),
                if strict { check.undeclared } else { Vec::new() },
                check.uncovered,
            )
            .into());
        }
        if !check.undeclared.is_empty() {
            warn!(
                step = %template.id(),
                dropped = ?check.undeclared,
                "Dropping parameters the function does not declare"
            );
        }

        // Static parameters win over dynamic ones, so shadowed inputs are
        // never resolved.
        let mut inputs = Vec::new();
        for (param, path) in template.context_inputs() {
            if !template.static_config().contains_key(param) {
                inputs.push((param.clone(), ContextPath::parse(path)?));
            }
        }

        let mut outputs = Vec::new();
        for (result_path, key) in template.context_outputs() {
            let source = if result_path == crate::context::DIRECT_VALUE {
                OutputSource::Direct
            } else {
                OutputSource::Field(ContextPath::parse(result_path)?)
            };
            outputs.push(OutputBinding {
                result_path: result_path.clone(),
                source,
                target: ContextPath::parse(key)?,
            });
        }

        debug!(
            step = %template.id(),
            function = %template.function_ref(),
            "Bound step to function"
        );

        Ok(Self {
            template,
            function,
            inputs,
            outputs,
            strict,
        })
    }

    /// Returns the step id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.template.id()
    }

    /// Returns the bound template.
    #[must_use]
    pub const fn template(&self) -> &StepTemplate {
        &self.template
    }

    /// Resolves every dynamic input from the context.
    ///
    /// # Errors
    ///
    /// Returns `MissingContextKeyError` for the first input that cannot be
    /// resolved.
    pub fn resolve_inputs(&self, ctx: &ExecutionContext) -> Result<Map<String, Value>, MissingContextKeyError> {
        let mut resolved = Map::new();
        for (param, path) in &self.inputs {
            let value = ctx.resolve_path(path)?;
            resolved.insert(param.clone(), value.clone());
        }
        Ok(resolved)
    }

    /// Fingerprints the inputs the step would see now, if they resolve.
    #[must_use]
    pub fn input_fingerprint(&self, ctx: &ExecutionContext) -> Option<String> {
        self.resolve_inputs(ctx)
            .ok()
            .map(|inputs| fingerprint_inputs(&inputs))
    }

    /// Evaluates the step, storing its outputs into the context.
    pub fn evaluate(&self, ctx: &mut ExecutionContext, data: &MarketData) -> StepOutcome {
        self.run(ctx, data).outcome
    }

    /// Evaluates the step and also returns its input fingerprint.
    pub fn run(&self, ctx: &mut ExecutionContext, data: &MarketData) -> Evaluation {
        let step_id = self.id();

        let resolved = match self.resolve_inputs(ctx) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(step = %step_id, error = %err, "Input not available");
                return Evaluation {
                    outcome: StepOutcome::failure(ErrorKind::MissingContextKey, err.to_string()),
                    input_fingerprint: None,
                };
            }
        };
        let input_fingerprint = Some(fingerprint_inputs(&resolved));

        let args = self.build_args(resolved);
        let outcome = match self.call(data, &args) {
            Ok(result) => self.map_outputs(ctx, &result),
            Err(err) => StepOutcome::failure(ErrorKind::Evaluation, err.to_string()),
        };

        Evaluation {
            outcome,
            input_fingerprint,
        }
    }

    fn build_args(&self, resolved: Map<String, Value>) -> StepArgs {
        let signature = self.function.signature();
        let mut args = self.template.static_config().clone();
        for (param, value) in resolved {
            args.entry(param).or_insert(value);
        }
        if !self.strict && !signature.accepts_extra() {
            args.retain(|param, _| signature.declares(param));
        }
        signature.apply_defaults(&mut args);
        StepArgs::new(args)
    }

    fn call(&self, data: &MarketData, args: &StepArgs) -> Result<StepResult, EvaluationError> {
        let function = &self.function;
        match catch_unwind(AssertUnwindSafe(|| function.call(data, args))) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => {
                warn!(step = %self.id(), error = %err, "Step function failed");
                Err(EvaluationError::new(self.id(), err.to_string()))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(step = %self.id(), panic = %message, "Step function panicked");
                Err(EvaluationError::new(self.id(), format!("panicked: {message}")))
            }
        }
    }

    fn map_outputs(&self, ctx: &mut ExecutionContext, result: &StepResult) -> StepOutcome {
        let normalized = result.normalize();
        let raw_result = result.to_value();

        // Extract everything first so a missing field stores nothing, then
        // commit the writes together so a conflicting path stores nothing.
        let mut extracted = Vec::with_capacity(self.outputs.len());
        for binding in &self.outputs {
            let value = match &binding.source {
                OutputSource::Direct => raw_result.clone(),
                OutputSource::Field(path) => match path.lookup(&normalized) {
                    Ok(value) => value.clone(),
                    Err(_) => {
                        let err = OutputMappingError::new(
                            self.id(),
                            &binding.result_path,
                            "field not present in result",
                        );
                        return StepOutcome::failure(ErrorKind::OutputMapping, err.to_string());
                    }
                },
            };
            extracted.push((&binding.target, value));
        }

        let writes = extracted.iter().map(|(target, value)| (*target, value.clone()));
        if let Err(err) = ctx.store_all(writes) {
            let err = OutputMappingError::new(self.id(), err.path(), err.to_string());
            return StepOutcome::failure(ErrorKind::OutputMapping, err.to_string());
        }

        let values: Map<String, Value> = extracted
            .into_iter()
            .map(|(target, value)| (target.as_str().to_string(), value))
            .collect();

        debug!(step = %self.id(), outputs = values.len(), "Stored step outputs");
        StepOutcome::success(values, raw_result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
