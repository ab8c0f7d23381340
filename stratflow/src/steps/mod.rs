//! Built-in step functions.
//!
//! Enabled by the `builtins` feature. Call [`register_builtins`] to make
//! them resolvable by their `module.symbol` references.

pub mod technical;

pub use technical::register_builtins;
