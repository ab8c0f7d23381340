//! Ordered bar sequence with a current position.

use super::Bar;
use std::sync::Arc;

/// Read-only market data handed to step functions.
///
/// Bars are shared, so moving the current index or cloning the view does
/// not copy the series.
#[derive(Debug, Clone)]
pub struct MarketData {
    symbol: Option<String>,
    bars: Arc<[Bar]>,
    current_index: usize,
}

impl Default for MarketData {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MarketData {
    /// Creates market data positioned at the last bar.
    #[must_use]
    pub fn new(bars: Vec<Bar>) -> Self {
        let current_index = bars.len().saturating_sub(1);
        Self {
            symbol: None,
            bars: bars.into(),
            current_index,
        }
    }

    /// Sets the symbol.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Returns a view positioned at `index`, clamped to the last bar.
    #[must_use]
    pub fn at(&self, index: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: Arc::clone(&self.bars),
            current_index: index.min(self.bars.len().saturating_sub(1)),
        }
    }

    /// Returns the symbol, if set.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Returns every bar.
    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Returns the number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns true if there are no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Returns the current index.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Returns the current bar.
    #[must_use]
    pub fn current(&self) -> Option<&Bar> {
        self.bars.get(self.current_index)
    }

    /// Returns the bar at an absolute index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Returns the bars up to and including the current one.
    #[must_use]
    pub fn window(&self) -> &[Bar] {
        if self.bars.is_empty() {
            return &[];
        }
        &self.bars[..=self.current_index]
    }

    /// Returns up to `n` bars immediately before the current one.
    #[must_use]
    pub fn lookback(&self, n: usize) -> &[Bar] {
        let start = self.current_index.saturating_sub(n);
        &self.bars[start..self.current_index.min(self.bars.len())]
    }

    /// Moves to the next bar. Returns false at the end of the series.
    pub fn advance(&mut self) -> bool {
        if self.current_index + 1 < self.bars.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }
}
