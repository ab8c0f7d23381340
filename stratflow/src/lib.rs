//! # Stratflow
//!
//! Configuration-driven strategy step pipelines over market data.
//!
//! A strategy is an ordered list of steps. Each step names a template in a
//! [`registry::StepRegistry`]; the template binds a pure analysis function
//! to values read from and written back to a shared
//! [`context::ExecutionContext`]. The pipeline runs the steps in order and
//! re-runs earlier steps whose inputs a later step changed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stratflow::prelude::*;
//!
//! let steps = StepRegistry::from_path("steps.toml")?;
//! let functions = FunctionRegistry::new();
//! register_builtins(&functions)?;
//!
//! let strategy = StrategyDefinition::from_path("strategy.toml")?;
//! let pipeline = PipelineBuilder::new(&steps, &functions).build(&strategy)?;
//!
//! let report = pipeline.run(ExecutionContext::new(), &market_data);
//! println!("{}", report.to_json());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod evaluator;
pub mod events;
pub mod functions;
pub mod market;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod testing;

#[cfg(feature = "builtins")]
pub mod steps;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigFormat, CyclePolicy, EngineConfig};
    pub use crate::context::{ExecutionContext, RunIdentity};
    pub use crate::core::{ErrorKind, StepOutcome, StepResult, StepStatus};
    pub use crate::errors::{
        ConfigError, ContractErrorInfo, CycleDetectedError, StepFunctionError, StratflowError,
    };
    pub use crate::evaluator::StepEvaluator;
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::functions::{FunctionRegistry, FunctionSignature, StepArgs, StepFunction};
    pub use crate::market::{Bar, MarketData};
    pub use crate::observability::{init_tracing, LoggingConfig};
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, RunReport, RunStatus, StrategyDefinition, StrategyStepSpec,
    };
    pub use crate::registry::{StepRegistry, StepTemplate};
    #[cfg(feature = "builtins")]
    pub use crate::steps::register_builtins;
}
