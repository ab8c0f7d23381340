//! The mutable per-run execution context.

use super::{ContextPath, OutcomeRecord, RunIdentity};
use crate::core::StepOutcome;
use crate::errors::{ContextWriteError, MissingContextKeyError};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Everything produced during one pipeline run.
///
/// The context owns a nested value namespace that steps read their inputs
/// from and write their outputs to, plus the ordered history of every
/// evaluation attempt. It is created fresh per run and never shared
/// between runs, so it needs no locking.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    identity: RunIdentity,
    values: Map<String, Value>,
    history: Vec<OutcomeRecord>,
    attempts: HashMap<String, u32>,
    latest: HashMap<String, usize>,
}

impl ExecutionContext {
    /// Creates an empty context with a fresh run identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty context for a specific run identity.
    #[must_use]
    pub fn with_identity(identity: RunIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    /// Seeds a value before the run starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or conflicts with an
    /// existing value.
    pub fn with_value(mut self, path: &str, value: Value) -> Result<Self, ContextWriteError> {
        self.store(path, value)?;
        Ok(self)
    }

    /// Returns the run identity.
    #[must_use]
    pub const fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Resolves a dotted path.
    ///
    /// # Errors
    ///
    /// Returns `MissingContextKeyError` if any segment is absent. A key that
    /// holds `null` or another falsy value resolves successfully.
    pub fn resolve(&self, path: &str) -> Result<&Value, MissingContextKeyError> {
        let parsed =
            ContextPath::parse(path).map_err(|_| MissingContextKeyError::new(path, path))?;
        parsed.lookup(&self.values)
    }

    /// Resolves an already parsed path.
    ///
    /// # Errors
    ///
    /// Returns `MissingContextKeyError` if any segment is absent.
    pub fn resolve_path(&self, path: &ContextPath) -> Result<&Value, MissingContextKeyError> {
        path.lookup(&self.values)
    }

    /// Returns true if the path resolves.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Stores a value at a dotted path, creating intermediate mappings.
    ///
    /// A later write to the same path overwrites the earlier one.
    ///
    /// # Errors
    ///
    /// Returns `ContextWriteError::PathConflict` if an intermediate segment
    /// already holds a non-mapping value, or `InvalidPath` for empty paths.
    pub fn store(&mut self, path: &str, value: Value) -> Result<(), ContextWriteError> {
        let parsed = ContextPath::parse(path)?;
        self.store_path(&parsed, value)
    }

    /// Stores a value at an already parsed path.
    ///
    /// # Errors
    ///
    /// Returns `ContextWriteError::PathConflict` if an intermediate segment
    /// already holds a non-mapping value.
    pub fn store_path(&mut self, path: &ContextPath, value: Value) -> Result<(), ContextWriteError> {
        store_into(&mut self.values, path, value)
    }

    /// Stores several values, all or none.
    ///
    /// Writes apply in order, so a later write may overwrite an earlier
    /// one. If any write fails the context is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first `ContextWriteError` encountered.
    pub fn store_all<'a>(
        &mut self,
        writes: impl IntoIterator<Item = (&'a ContextPath, Value)>,
    ) -> Result<(), ContextWriteError> {
        let mut staged = self.values.clone();
        for (path, value) in writes {
            store_into(&mut staged, path, value)?;
        }
        self.values = staged;
        Ok(())
    }

    /// Appends an outcome to the history and returns its attempt number.
    pub fn record_outcome(&mut self, step_id: impl Into<String>, outcome: StepOutcome) -> u32 {
        self.record_evaluation(step_id, outcome, None, None)
    }

    /// Appends an outcome with its input fingerprint and bar timestamp.
    pub fn record_evaluation(
        &mut self,
        step_id: impl Into<String>,
        outcome: StepOutcome,
        input_fingerprint: Option<String>,
        bar_timestamp: Option<DateTime<Utc>>,
    ) -> u32 {
        let step_id = step_id.into();
        let attempt = self.attempts.entry(step_id.clone()).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;

        self.latest.insert(step_id.clone(), self.history.len());
        self.history.push(OutcomeRecord {
            step_id,
            attempt,
            outcome,
            input_fingerprint,
            bar_timestamp,
            recorded_at: Utc::now(),
        });

        attempt
    }

    /// Returns the most recent outcome for a step.
    #[must_use]
    pub fn latest_outcome(&self, step_id: &str) -> Option<&StepOutcome> {
        self.latest_record(step_id).map(|record| &record.outcome)
    }

    /// Returns the most recent history entry for a step.
    #[must_use]
    pub fn latest_record(&self, step_id: &str) -> Option<&OutcomeRecord> {
        self.latest
            .get(step_id)
            .and_then(|&index| self.history.get(index))
    }

    /// Returns how many times a step has been evaluated in this run.
    #[must_use]
    pub fn attempts(&self, step_id: &str) -> u32 {
        self.attempts.get(step_id).copied().unwrap_or(0)
    }

    /// Returns the full ordered history.
    #[must_use]
    pub fn history(&self) -> &[OutcomeRecord] {
        &self.history
    }

    /// Returns the history entries of one step, oldest first.
    pub fn history_for<'a>(&'a self, step_id: &'a str) -> impl Iterator<Item = &'a OutcomeRecord> + 'a {
        self.history.iter().filter(move |record| record.step_id == step_id)
    }

    /// Returns the value namespace.
    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Returns the value namespace as a JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Consumes the context and returns the value namespace.
    #[must_use]
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

fn store_into(
    root: &mut Map<String, Value>,
    path: &ContextPath,
    value: Value,
) -> Result<(), ContextWriteError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(ContextWriteError::InvalidPath {
            path: path.to_string(),
        });
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(ContextWriteError::PathConflict {
                    path: path.to_string(),
                    segment: segment.clone(),
                })
            }
        };
    }

    current.insert(last.clone(), value);
    Ok(())
}
