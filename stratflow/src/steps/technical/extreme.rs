//! Extreme bar of the current trend.

use super::trend::{Trend, DEFAULT_FRAME_SIZE};
use crate::core::StepResult;
use crate::errors::StepFunctionError;
use crate::functions::{FunctionSignature, StepArgs};
use crate::market::MarketData;
use serde_json::{json, Value};

/// Registry reference of [`find_extreme`].
pub const FIND_EXTREME: &str = "technical.extreme.find_extreme";

/// Parameters of [`find_extreme`].
#[must_use]
pub fn signature() -> FunctionSignature {
    FunctionSignature::new()
        .required("trend")
        .optional("frame_size", DEFAULT_FRAME_SIZE)
}

/// Finds the highest high (UP) or lowest low (DOWN) over the last
/// `frame_size` bars, the current one included.
///
/// Returns `{is_extreme, extreme_bar_index, extreme_price}`. Ties resolve
/// to the latest bar. A sideways trend has no extreme: the flag is false
/// and the index and price are null.
///
/// # Errors
///
/// Fails with `InsufficientData` when fewer than `frame_size` bars end at
/// the current one, and `InvalidArgument` for an unknown trend or a zero
/// `frame_size`.
pub fn find_extreme(data: &MarketData, args: &StepArgs) -> Result<StepResult, StepFunctionError> {
    let trend: Trend = args.get_str("trend")?.parse()?;
    let frame_size = args.get_usize("frame_size")?;
    if frame_size == 0 {
        return Err(StepFunctionError::invalid("frame_size", "must be at least 1"));
    }

    let window = data.window();
    if window.len() < frame_size {
        return Err(StepFunctionError::InsufficientData {
            required: frame_size,
            available: window.len(),
        });
    }

    let start = window.len() - frame_size;
    let current = window.len() - 1;

    let extreme = match trend {
        Trend::Sideways => None,
        Trend::Up => window[start..]
            .iter()
            .enumerate()
            .map(|(offset, bar)| (start + offset, bar.high))
            .reduce(|best, next| if next.1 >= best.1 { next } else { best }),
        Trend::Down => window[start..]
            .iter()
            .enumerate()
            .map(|(offset, bar)| (start + offset, bar.low))
            .reduce(|best, next| if next.1 <= best.1 { next } else { best }),
    };

    let result = match extreme {
        Some((index, price)) => json!({
            "is_extreme": index == current,
            "extreme_bar_index": index,
            "extreme_price": price,
        }),
        None => json!({
            "is_extreme": false,
            "extreme_bar_index": Value::Null,
            "extreme_price": Value::Null,
        }),
    };

    Ok(StepResult::from(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ohlc_bars, trending_bars};

    fn args(trend: &str, frame_size: u64) -> StepArgs {
        [
            ("trend".to_string(), json!(trend)),
            ("frame_size".to_string(), json!(frame_size)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_current_bar_is_extreme_in_uptrend() {
        let result = find_extreme(&trending_bars(10, 1.0), &args("UP", 5)).unwrap();
        let map = result.normalize();
        assert_eq!(map["is_extreme"], json!(true));
        assert_eq!(map["extreme_bar_index"], json!(9));
    }

    #[test]
    fn test_earlier_peak_is_not_current() {
        let data = ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 110.0, 99.0, 108.0),
            (108.0, 109.0, 104.0, 105.0),
        ]);
        let map = find_extreme(&data, &args("UP", 3)).unwrap().normalize();
        assert_eq!(map["is_extreme"], json!(false));
        assert_eq!(map["extreme_bar_index"], json!(1));
        assert_eq!(map["extreme_price"], json!(110.0));
    }

    #[test]
    fn test_lowest_low_in_downtrend() {
        let map = find_extreme(&trending_bars(8, -1.0), &args("down", 4))
            .unwrap()
            .normalize();
        assert_eq!(map["is_extreme"], json!(true));
        assert_eq!(map["extreme_bar_index"], json!(7));
    }

    #[test]
    fn test_sideways_has_no_extreme() {
        let map = find_extreme(&trending_bars(5, 1.0), &args("SIDEWAYS", 3))
            .unwrap()
            .normalize();
        assert_eq!(map["is_extreme"], json!(false));
        assert_eq!(map["extreme_bar_index"], Value::Null);
    }

    #[test]
    fn test_invalid_inputs() {
        let data = trending_bars(3, 1.0);
        assert!(matches!(
            find_extreme(&data, &args("north", 2)),
            Err(StepFunctionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            find_extreme(&data, &args("UP", 5)),
            Err(StepFunctionError::InsufficientData {
                required: 5,
                available: 3
            })
        ));
    }
}
