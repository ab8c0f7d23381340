//! Trend direction from the close `frame_size` bars back.

use crate::core::StepResult;
use crate::errors::StepFunctionError;
use crate::functions::{FunctionSignature, StepArgs};
use crate::market::MarketData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry reference of [`detect_trend`].
pub const DETECT_TREND: &str = "technical.trend.detect_trend";

/// Default number of bars between the compared closes.
pub const DEFAULT_FRAME_SIZE: u64 = 20;

/// Direction of the market over a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// Close rose over the frame.
    Up,
    /// Close fell over the frame.
    Down,
    /// Close unchanged.
    Sideways,
}

impl Trend {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Sideways => "SIDEWAYS",
        }
    }

    /// Classifies a move from `from` to `to`.
    #[must_use]
    pub fn between(from: f64, to: f64) -> Self {
        if to > from {
            Self::Up
        } else if to < from {
            Self::Down
        } else {
            Self::Sideways
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trend {
    type Err = StepFunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "SIDEWAYS" => Ok(Self::Sideways),
            _ => Err(StepFunctionError::invalid(
                "trend",
                format!("expected UP, DOWN or SIDEWAYS, got '{s}'"),
            )),
        }
    }
}

/// Parameters of [`detect_trend`].
#[must_use]
pub fn signature() -> FunctionSignature {
    FunctionSignature::new().optional("frame_size", DEFAULT_FRAME_SIZE)
}

/// Compares the current close with the close `frame_size` bars back.
///
/// Returns the trend name as a scalar result.
///
/// # Errors
///
/// Fails with `InsufficientData` when fewer than `frame_size + 1` bars end
/// at the current one, and `InvalidArgument` when `frame_size` is zero.
pub fn detect_trend(data: &MarketData, args: &StepArgs) -> Result<StepResult, StepFunctionError> {
    let frame_size = args.get_usize("frame_size")?;
    if frame_size == 0 {
        return Err(StepFunctionError::invalid("frame_size", "must be at least 1"));
    }

    let window = data.window();
    if window.len() <= frame_size {
        return Err(StepFunctionError::InsufficientData {
            required: frame_size + 1,
            available: window.len(),
        });
    }

    let current = window.len() - 1;
    let trend = Trend::between(window[current - frame_size].close, window[current].close);
    Ok(StepResult::scalar(trend.as_str()))
}
