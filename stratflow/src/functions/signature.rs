//! Declared parameter contracts of step functions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One declared function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Default value; `None` makes the parameter required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Creates a parameter with a default value.
    #[must_use]
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Returns true if the parameter has no default.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The parameters a step function declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    params: Vec<ParamSpec>,
    #[serde(default)]
    accepts_extra: bool,
}

/// Result of checking supplied parameter names against a signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureCheck {
    /// Supplied names the function does not declare.
    pub undeclared: Vec<String>,
    /// Required parameters that were not supplied.
    pub uncovered: Vec<String>,
}

impl SignatureCheck {
    /// Returns true if the binding is valid.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.undeclared.is_empty() && self.uncovered.is_empty()
    }
}

impl FunctionSignature {
    /// Creates an empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required parameter.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec::required(name));
        self
    }

    /// Adds a parameter with a default value.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(ParamSpec::optional(name, default));
        self
    }

    /// Accepts parameter names beyond the declared ones.
    #[must_use]
    pub fn accepting_extra(mut self) -> Self {
        self.accepts_extra = true;
        self
    }

    /// Returns the declared parameters in order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Returns true if undeclared names are accepted.
    #[must_use]
    pub const fn accepts_extra(&self) -> bool {
        self.accepts_extra
    }

    /// Looks up a declared parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Returns true if the function declares `name`.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Returns the names of required parameters.
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
    }

    /// Checks a set of supplied parameter names.
    #[must_use]
    pub fn check<'a>(&self, supplied: impl IntoIterator<Item = &'a str>) -> SignatureCheck {
        let supplied: BTreeSet<&str> = supplied.into_iter().collect();

        let undeclared = if self.accepts_extra {
            Vec::new()
        } else {
            supplied
                .iter()
                .filter(|name| !self.declares(name))
                .map(|name| (*name).to_string())
                .collect()
        };

        let uncovered = self
            .required_params()
            .filter(|name| !supplied.contains(name))
            .map(str::to_string)
            .collect();

        SignatureCheck {
            undeclared,
            uncovered,
        }
    }

    /// Fills in defaults for declared parameters missing from `args`.
    pub fn apply_defaults(&self, args: &mut Map<String, Value>) {
        for param in &self.params {
            if let Some(ref default) = param.default {
                args.entry(param.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }
}
