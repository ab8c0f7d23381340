//! Testing utilities for stratflow pipelines.
//!
//! This module provides:
//! - A recording, scriptable mock step function
//! - Bar series and template fixtures
//! - Assertions over run reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_context_value, assert_step_failed, assert_step_passed, assert_step_pending,
};
pub use fixtures::{bar, bars_fixture, fixture_start, ohlc_bars, template, trending_bars};
pub use mocks::MockFunction;
