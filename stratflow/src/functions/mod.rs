//! Step functions and their registry.
//!
//! Step templates name their function by a `module.symbol` reference. The
//! [`FunctionRegistry`] maps those references to callables that declare
//! their parameters through a [`FunctionSignature`].

mod args;
mod function;
mod registry;
mod signature;

pub use args::StepArgs;
#[cfg(test)]
pub use function::MockStepFunction;
pub use function::{FnStepFunction, StepFunction};
pub use registry::{FunctionRef, FunctionRegistry};
pub use signature::{FunctionSignature, ParamSpec, SignatureCheck};
