//! The step registry.
//!
//! A [`StepRegistry`] is loaded once from a configuration document and is
//! read-only afterwards. Loading happens in two passes: the first builds
//! every [`StepTemplate`] keeping `reevaluates` as raw ids, the second
//! confirms every id exists. All problems found are reported together and
//! no partial registry is ever returned.

mod document;
#[cfg(test)]
mod registry_tests;
mod template;

pub use template::StepTemplate;

use crate::config::{read_document, ConfigFormat};
use crate::errors::{ConfigError, IssueCollector, NotFoundError, StratflowError};
use crate::functions::FunctionRef;
use document::RegistryDocument;
use std::collections::HashMap;
use std::path::Path;

/// Validated, insertion-ordered collection of step templates.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    templates: HashMap<String, StepTemplate>,
    order: Vec<String>,
}

impl StepRegistry {
    /// Loads a registry from a document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is malformed, a step lacks an
    /// id or function, an id is duplicated, or a `reevaluates` entry names
    /// an unknown step.
    pub fn load(source: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let document: RegistryDocument = format.parse(source)?;
        Self::from_document(document)
    }

    /// Loads a registry from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the registry is
    /// invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StratflowError> {
        let document: RegistryDocument = read_document(path.as_ref())?;
        Ok(Self::from_document(document)?)
    }

    /// Builds a registry from templates, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` under the same rules as [`StepRegistry::load`].
    pub fn from_templates(templates: Vec<StepTemplate>) -> Result<Self, ConfigError> {
        let mut issues = IssueCollector::new();
        let registry = Self::resolve(templates, &mut issues);
        issues.finish("Invalid step registry")?;
        Ok(registry)
    }

    fn from_document(document: RegistryDocument) -> Result<Self, ConfigError> {
        let mut issues = IssueCollector::new();
        let mut templates = Vec::with_capacity(document.steps.0.len());

        // Pass 1: build templates with reevaluates kept as raw ids.
        for (id, raw) in document.steps.0 {
            let step = Some(id.as_str());

            let function = match raw.function.as_deref().map(str::trim) {
                Some(function) if !function.is_empty() => function.to_string(),
                _ => {
                    issues.push(
                        "REGISTRY-001-MISSING_FIELD",
                        step,
                        format!("Step '{id}' has no function reference"),
                    );
                    continue;
                }
            };

            let function_ref = match FunctionRef::parse(&function) {
                Ok(function_ref) => function_ref,
                Err(_) => {
                    issues.push(
                        "REGISTRY-004-FUNCTION_REF",
                        step,
                        format!("Step '{id}' has invalid function reference '{function}'"),
                    );
                    continue;
                }
            };

            let mut template = StepTemplate::new(id.trim(), function_ref);
            if let Some(description) = raw.description {
                template = template.with_description(description);
            }
            for (param, value) in raw.static_config {
                template = template.with_static(param, value);
            }
            for (param, path) in raw.context_inputs {
                template = template.with_input(param, path);
            }
            for (result_path, key) in raw.context_outputs {
                template = template.with_output(result_path, key);
            }
            for target in raw.reevaluates {
                template = template.with_reevaluates(target.trim());
            }
            templates.push(template);
        }

        let registry = Self::resolve(templates, &mut issues);
        issues.finish("Invalid step registry")?;

        tracing::info!(steps = registry.len(), "Loaded step registry");
        Ok(registry)
    }

    /// Pass 2: confirms ids are unique and every reevaluates id exists.
    fn resolve(templates: Vec<StepTemplate>, issues: &mut IssueCollector) -> Self {
        let mut registry = Self::default();

        for template in templates {
            template.validate_into(issues);

            if registry.templates.contains_key(template.id()) {
                issues.push(
                    "REGISTRY-002-DUPLICATE_ID",
                    Some(template.id()),
                    format!("Duplicate step id '{}'", template.id()),
                );
                continue;
            }

            registry.order.push(template.id().to_string());
            registry
                .templates
                .insert(template.id().to_string(), template);
        }

        for id in &registry.order {
            let Some(template) = registry.templates.get(id) else {
                continue;
            };
            for target in template.reevaluates() {
                if target != id && !registry.templates.contains_key(target) {
                    issues.push(
                        "REGISTRY-003-UNKNOWN_REEVALUATES",
                        Some(id),
                        format!("Step '{id}' reevaluates unknown step '{target}'"),
                    );
                }
            }
        }

        registry
    }

    /// Returns a template by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError` if no step has that id.
    pub fn get(&self, id: &str) -> Result<&StepTemplate, NotFoundError> {
        self.templates.get(id).ok_or_else(|| NotFoundError::step(id))
    }

    /// Returns true if a step has that id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Iterates templates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StepTemplate> {
        self.order.iter().filter_map(|id| self.templates.get(id))
    }

    /// Returns step ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Returns the number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
