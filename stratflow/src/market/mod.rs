//! Market data consumed read-only by step functions.

mod bar;
mod data;

pub use bar::Bar;
pub use data::MarketData;
