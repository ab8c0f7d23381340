//! Mock step functions for testing.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::core::StepResult;
use crate::errors::StepFunctionError;
use crate::functions::{FunctionSignature, StepArgs, StepFunction};
use crate::market::MarketData;

/// A step function that records its calls and returns scripted results.
///
/// Scripted results are returned in order; once they run out the fallback
/// is returned for every further call.
#[derive(Debug)]
pub struct MockFunction {
    signature: FunctionSignature,
    script: Mutex<VecDeque<Result<StepResult, StepFunctionError>>>,
    fallback: Mutex<Result<StepResult, StepFunctionError>>,
    calls: Mutex<Vec<StepArgs>>,
}

impl MockFunction {
    /// Creates a mock returning `null` until told otherwise.
    #[must_use]
    pub fn new(signature: FunctionSignature) -> Self {
        Self {
            signature,
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(StepResult::scalar(serde_json::Value::Null))),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that always returns `result`.
    #[must_use]
    pub fn returning(signature: FunctionSignature, result: impl Into<StepResult>) -> Self {
        let mock = Self::new(signature);
        mock.set_result(result);
        mock
    }

    /// Creates a mock that always fails with `message`.
    #[must_use]
    pub fn failing(signature: FunctionSignature, message: impl Into<String>) -> Self {
        let mock = Self::new(signature);
        *mock.fallback.lock() = Err(StepFunctionError::failed(message));
        mock
    }

    /// Sets the result returned once the script is exhausted.
    pub fn set_result(&self, result: impl Into<StepResult>) {
        *self.fallback.lock() = Ok(result.into());
    }

    /// Queues a result for the next unscripted call.
    pub fn push_result(&self, result: Result<StepResult, StepFunctionError>) {
        self.script.lock().push_back(result);
    }

    /// Returns the number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the arguments of every call.
    #[must_use]
    pub fn calls(&self) -> Vec<StepArgs> {
        self.calls.lock().clone()
    }

    /// Returns the arguments of the most recent call.
    #[must_use]
    pub fn last_call(&self) -> Option<StepArgs> {
        self.calls.lock().last().cloned()
    }

    /// Clears recorded calls and scripted results.
    pub fn reset(&self) {
        self.calls.lock().clear();
        self.script.lock().clear();
    }
}

impl StepFunction for MockFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call(&self, _data: &MarketData, args: &StepArgs) -> Result<StepResult, StepFunctionError> {
        self.calls.lock().push(args.clone());
        match self.script.lock().pop_front() {
            Some(result) => result,
            None => self.fallback.lock().clone(),
        }
    }
}
