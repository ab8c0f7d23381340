//! Wide range bar detection.
//!
//! A wide range bar (WRB) series is a run of consecutive directional bars
//! ending at the current bar. In an up run every bar makes a higher high
//! and a higher low and closes above the previous high; a down run mirrors
//! that. The series range (highest high minus lowest low) is compared with
//! the ranges of the bars before it.

use crate::core::StepResult;
use crate::errors::StepFunctionError;
use crate::functions::{FunctionSignature, StepArgs};
use crate::market::{Bar, MarketData};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::debug;

/// Registry reference of [`detect_wide_range_bar`].
pub const DETECT_WIDE_RANGE_BAR: &str = "technical.wrb.detect_wide_range_bar";

/// How the lookback ranges collapse into one reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMethod {
    /// Widest lookback bar.
    Max,
    /// Mean lookback range.
    Avg,
}

impl ComparisonMethod {
    /// Reduces lookback ranges to the reference range.
    #[must_use]
    pub fn reference(&self, ranges: &[f64]) -> f64 {
        match self {
            Self::Max => ranges.iter().copied().fold(0.0, f64::max),
            Self::Avg if ranges.is_empty() => 0.0,
            #[allow(clippy::cast_precision_loss)]
            Self::Avg => ranges.iter().sum::<f64>() / ranges.len() as f64,
        }
    }
}

impl FromStr for ComparisonMethod {
    type Err = StepFunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "avg" => Ok(Self::Avg),
            _ => Err(StepFunctionError::invalid(
                "comparison_method",
                format!("expected 'max' or 'avg', got '{s}'"),
            )),
        }
    }
}

/// A directional run ending at the current bar.
#[derive(Debug, Clone, PartialEq)]
pub struct WrbSeries {
    /// Absolute bar indices, ascending.
    pub indices: Vec<usize>,
    /// Highest high minus lowest low over the run.
    pub range: f64,
}

fn is_up_bar(curr: &Bar, prev: &Bar) -> bool {
    curr.high > prev.high && curr.low > prev.low && curr.close > prev.high
}

fn is_down_bar(curr: &Bar, prev: &Bar) -> bool {
    curr.low < prev.low && curr.high < prev.high && curr.close < prev.low
}

/// Finds the directional run ending at the current bar.
///
/// Returns `None` when the current bar is not directional relative to the
/// bar before it.
#[must_use]
pub fn wide_range_series(data: &MarketData) -> Option<WrbSeries> {
    let window = data.window();
    let mut indices = Vec::new();

    for pos in (1..window.len()).rev() {
        let (curr, prev) = (&window[pos], &window[pos - 1]);
        if is_up_bar(curr, prev) == is_down_bar(curr, prev) {
            break;
        }
        indices.push(pos);
    }

    if indices.is_empty() {
        return None;
    }
    indices.reverse();

    let high = indices
        .iter()
        .map(|&i| window[i].high)
        .fold(f64::NEG_INFINITY, f64::max);
    let low = indices
        .iter()
        .map(|&i| window[i].low)
        .fold(f64::INFINITY, f64::min);

    Some(WrbSeries {
        indices,
        range: high - low,
    })
}

/// Parameters of [`detect_wide_range_bar`].
#[must_use]
pub fn signature() -> FunctionSignature {
    FunctionSignature::new()
        .optional("lookback_bars", 20)
        .optional("min_size_increase_pct", 0.5)
        .optional("comparison_method", "max")
}

/// Detects whether a WRB series ends at the current bar.
///
/// Returns `{is_wide_range, size_increase_pct, wrb_bar_indices}`.
/// `size_increase_pct` is the fractional growth of the series range over
/// the reference range (`0.5` means 50% wider) and is null when no series
/// ends at the current bar.
///
/// # Errors
///
/// Fails with `InsufficientData` when fewer than `lookback_bars` bars
/// precede the current one, `InvalidArgument` for a bad parameter, and
/// `Failed` when the reference range is zero.
pub fn detect_wide_range_bar(
    data: &MarketData,
    args: &StepArgs,
) -> Result<StepResult, StepFunctionError> {
    let lookback_bars = args.get_usize("lookback_bars")?;
    let min_increase = args.get_f64("min_size_increase_pct")?;
    let method: ComparisonMethod = args.get_str("comparison_method")?.parse()?;

    if lookback_bars == 0 {
        return Err(StepFunctionError::invalid("lookback_bars", "must be at least 1"));
    }
    if data.is_empty() || data.current_index() < lookback_bars {
        return Err(StepFunctionError::InsufficientData {
            required: lookback_bars + 1,
            available: data.window().len(),
        });
    }

    let Some(series) = wide_range_series(data) else {
        return Ok(StepResult::from(json!({
            "is_wide_range": false,
            "size_increase_pct": Value::Null,
            "wrb_bar_indices": [],
        })));
    };

    let ranges: Vec<f64> = data.lookback(lookback_bars).iter().map(Bar::range).collect();
    let reference = method.reference(&ranges);
    if reference == 0.0 {
        return Err(StepFunctionError::failed("Reference range is zero"));
    }

    let size_increase = series.range / reference - 1.0;
    debug!(
        range = series.range,
        reference,
        size_increase,
        bars = series.indices.len(),
        "Wide range series measured"
    );

    Ok(StepResult::from(json!({
        "is_wide_range": size_increase >= min_increase,
        "size_increase_pct": size_increase,
        "wrb_bar_indices": series.indices,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ohlc_bars;

    const FLAT: (f64, f64, f64, f64) = (100.0, 101.0, 99.0, 100.0);

    fn args(lookback: u64, method: &str) -> StepArgs {
        [
            ("lookback_bars".to_string(), json!(lookback)),
            ("min_size_increase_pct".to_string(), json!(0.5)),
            ("comparison_method".to_string(), json!(method)),
        ]
        .into_iter()
        .collect()
    }

    fn series_data() -> MarketData {
        ohlc_bars(&[
            FLAT,
            FLAT,
            FLAT,
            FLAT,
            FLAT,
            (100.0, 106.0, 100.5, 105.5),
            (105.5, 110.0, 105.0, 109.8),
        ])
    }

    fn approx(value: &Value, expected: f64) -> bool {
        value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn test_single_bar_series() {
        let data = series_data().at(5);
        let map = detect_wide_range_bar(&data, &args(5, "max"))
            .unwrap()
            .normalize();
        assert_eq!(map["is_wide_range"], json!(true));
        assert_eq!(map["wrb_bar_indices"], json!([5]));
        assert!(approx(&map["size_increase_pct"], 1.75));
    }

    #[test]
    fn test_multi_bar_series() {
        let series = wide_range_series(&series_data()).unwrap();
        assert_eq!(series.indices, vec![5, 6]);
        assert!((series.range - 9.5).abs() < 1e-9);

        let map = detect_wide_range_bar(&series_data(), &args(5, "max"))
            .unwrap()
            .normalize();
        assert!(approx(&map["size_increase_pct"], 9.5 / 5.5 - 1.0));

        let map = detect_wide_range_bar(&series_data(), &args(5, "avg"))
            .unwrap()
            .normalize();
        assert!(approx(&map["size_increase_pct"], 9.5 / 2.7 - 1.0));
    }

    #[test]
    fn test_below_threshold() {
        let data = ohlc_bars(&[FLAT, FLAT, FLAT, (100.0, 102.0, 99.5, 101.5)]);
        let map = detect_wide_range_bar(&data, &args(3, "max"))
            .unwrap()
            .normalize();
        assert_eq!(map["is_wide_range"], json!(false));
        assert!(approx(&map["size_increase_pct"], 0.25));
    }

    #[test]
    fn test_non_directional_bar() {
        let data = ohlc_bars(&[FLAT, FLAT, FLAT]);
        let map = detect_wide_range_bar(&data, &args(2, "max"))
            .unwrap()
            .normalize();
        assert_eq!(map["is_wide_range"], json!(false));
        assert_eq!(map["size_increase_pct"], Value::Null);
        assert_eq!(map["wrb_bar_indices"], json!([]));
    }

    #[test]
    fn test_insufficient_lookback() {
        assert!(matches!(
            detect_wide_range_bar(&series_data().at(2), &args(5, "max")),
            Err(StepFunctionError::InsufficientData {
                required: 6,
                available: 3
            })
        ));
        assert!(detect_wide_range_bar(&MarketData::default(), &args(5, "max")).is_err());
    }

    #[test]
    fn test_invalid_method() {
        assert!(matches!(
            detect_wide_range_bar(&series_data(), &args(5, "median")),
            Err(StepFunctionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_zero_reference_range() {
        let data = ohlc_bars(&[
            (100.0, 100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0, 100.0),
            (100.0, 102.0, 100.5, 101.5),
        ]);
        assert_eq!(
            detect_wide_range_bar(&data, &args(2, "max")),
            Err(StepFunctionError::failed("Reference range is zero"))
        );
    }
}
