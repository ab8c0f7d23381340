//! Dotted paths into the context namespace.

use crate::errors::{ContextWriteError, MissingContextKeyError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Output path meaning "the whole return value".
pub const DIRECT_VALUE: &str = "_";

/// A parsed, non-empty dotted path such as `analysis.direction`.
///
/// Numeric segments index into sequences when resolving
/// (`swings.0.index`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContextPath {
    raw: String,
    segments: Vec<String>,
}

impl ContextPath {
    /// Parses a dotted path.
    ///
    /// # Errors
    ///
    /// Returns `ContextWriteError::InvalidPath` if the path or any of its
    /// segments is empty. Whitespace around segments is dropped.
    pub fn parse(path: &str) -> Result<Self, ContextWriteError> {
        let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();

        if segments.iter().any(String::is_empty) {
            return Err(ContextWriteError::InvalidPath {
                path: path.to_string(),
            });
        }

        Ok(Self {
            raw: segments.join("."),
            segments,
        })
    }

    /// Returns the normalized path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the individual segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true if this is the direct-value sentinel `_`.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.raw == DIRECT_VALUE
    }

    /// Looks the path up in a mapping.
    ///
    /// # Errors
    ///
    /// Returns `MissingContextKeyError` naming the first segment that could
    /// not be followed. A present `null` is returned as a value.
    pub fn lookup<'a>(&self, root: &'a Map<String, Value>) -> Result<&'a Value, MissingContextKeyError> {
        let (first, rest) = self
            .segments
            .split_first()
            .ok_or_else(|| MissingContextKeyError::new(&self.raw, ""))?;

        let mut current = root
            .get(first)
            .ok_or_else(|| MissingContextKeyError::new(&self.raw, first))?;

        for segment in rest {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| MissingContextKeyError::new(&self.raw, segment))?;
        }

        Ok(current)
    }
}

impl fmt::Display for ContextPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ContextPath {
    type Err = ContextWriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContextPath {
    type Error = ContextWriteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContextPath> for String {
    fn from(path: ContextPath) -> Self {
        path.raw
    }
}
