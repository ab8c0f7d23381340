//! Serde shape of a step registry document.
//!
//! ```toml
//! [steps.detect_trend]
//! function = "technical.trend.detect_trend"
//! context_outputs = { "_" = "trend" }
//!
//! [steps.find_extreme]
//! function = "technical.extreme.find_extreme"
//! context_inputs = { trend = "trend" }
//! static_config = { frame_size = 20 }
//! context_outputs = { is_extreme = "is_extreme", extreme_bar_index = "extreme_bar_index" }
//! ```

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Top level of a registry document. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegistryDocument {
    #[serde(default)]
    pub steps: OrderedSteps,
}

/// One step entry as written, before validation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawStep {
    #[serde(default, alias = "function_ref", alias = "pure_function")]
    pub function: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "input_params_map")]
    pub context_inputs: BTreeMap<String, String>,
    /// Result path -> context key, with `_` as the result path for the
    /// whole return value. The `return_map` alias is read in the same
    /// direction; older documents that wrote `context_key = "_"` must swap
    /// key and value.
    #[serde(default, alias = "return_map")]
    pub context_outputs: BTreeMap<String, String>,
    #[serde(default, alias = "config_mapping")]
    pub static_config: Map<String, Value>,
    #[serde(default)]
    pub reevaluates: Vec<String>,
}

/// Step entries in document order, duplicates kept for validation.
#[derive(Debug, Default)]
pub(crate) struct OrderedSteps(pub Vec<(String, RawStep)>);

impl<'de> Deserialize<'de> for OrderedSteps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StepsVisitor;

        impl<'de> Visitor<'de> for StepsVisitor {
            type Value = OrderedSteps;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of step id to step definition")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut steps = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((id, step)) = map.next_entry::<String, RawStep>()? {
                    steps.push((id, step));
                }
                Ok(OrderedSteps(steps))
            }
        }

        deserializer.deserialize_map(StepsVisitor)
    }
}
