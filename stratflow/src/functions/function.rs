//! The step function trait and closure adapter.

use super::{FunctionSignature, StepArgs};
use crate::core::StepResult;
use crate::errors::StepFunctionError;
use crate::market::MarketData;
use std::fmt::Debug;

/// A pure analysis function a step invokes.
///
/// Implementations read their arguments and the market data and return a
/// result without touching shared state.
#[cfg_attr(test, mockall::automock)]
pub trait StepFunction: Send + Sync {
    /// Returns the declared parameters.
    fn signature(&self) -> &FunctionSignature;

    /// Runs the function.
    ///
    /// # Errors
    ///
    /// Returns a `StepFunctionError` when the function cannot produce a
    /// result.
    fn call(&self, data: &MarketData, args: &StepArgs) -> Result<StepResult, StepFunctionError>;
}

/// A step function backed by a closure.
pub struct FnStepFunction<F>
where
    F: Fn(&MarketData, &StepArgs) -> Result<StepResult, StepFunctionError> + Send + Sync,
{
    signature: FunctionSignature,
    func: F,
}

impl<F> FnStepFunction<F>
where
    F: Fn(&MarketData, &StepArgs) -> Result<StepResult, StepFunctionError> + Send + Sync,
{
    /// Creates a new closure-backed function.
    pub const fn new(signature: FunctionSignature, func: F) -> Self {
        Self { signature, func }
    }
}

impl<F> Debug for FnStepFunction<F>
where
    F: Fn(&MarketData, &StepArgs) -> Result<StepResult, StepFunctionError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStepFunction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl<F> StepFunction for FnStepFunction<F>
where
    F: Fn(&MarketData, &StepArgs) -> Result<StepResult, StepFunctionError> + Send + Sync,
{
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call(&self, data: &MarketData, args: &StepArgs) -> Result<StepResult, StepFunctionError> {
        (self.func)(data, args)
    }
}
