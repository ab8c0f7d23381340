//! Market data and registry fixtures.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::functions::FunctionRef;
use crate::market::{Bar, MarketData};
use crate::registry::StepTemplate;

/// Start time of every fixture series.
#[must_use]
pub fn fixture_start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Creates one bar, `index` hours after the fixture start.
#[must_use]
pub fn bar(index: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    let hours = i64::try_from(index).unwrap_or(i64::MAX);
    Bar::new(
        fixture_start() + Duration::hours(hours),
        open,
        high,
        low,
        close,
        1_000.0,
    )
}

/// A flat series of `n` identical bars.
#[must_use]
pub fn bars_fixture(n: usize) -> MarketData {
    MarketData::new((0..n).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect())
}

/// `n` bars whose close moves by `step` every bar.
///
/// Each bar opens at the previous close and spans one unit beyond both
/// ends, so a positive `step` gives higher highs and higher lows.
#[must_use]
pub fn trending_bars(n: usize, step: f64) -> MarketData {
    let mut close = 100.0;
    let bars = (0..n)
        .map(|i| {
            let open = close;
            close += step;
            bar(i, open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    MarketData::new(bars)
}

/// Market data built from `(open, high, low, close)` tuples.
#[must_use]
pub fn ohlc_bars(prices: &[(f64, f64, f64, f64)]) -> MarketData {
    MarketData::new(
        prices
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| bar(i, open, high, low, close))
            .collect(),
    )
}

/// A template with no inputs, outputs or config.
///
/// # Panics
///
/// Panics if `function` is not a dotted function reference.
#[must_use]
pub fn template(id: &str, function: &str) -> StepTemplate {
    match FunctionRef::parse(function) {
        Ok(reference) => StepTemplate::new(id, reference),
        Err(err) => panic!("invalid fixture function reference: {err}"),
    }
}
