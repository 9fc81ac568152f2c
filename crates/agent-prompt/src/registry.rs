use crate::{JinjaTemplate, PromptError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Templates by name
///
/// Registering a name twice keeps the later template, which is how
/// directory overrides replace built-in prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: BTreeMap<String, JinjaTemplate>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: JinjaTemplate) {
        self.templates.insert(template.name().to_string(), template);
    }

    #[must_use]
    pub fn with_template(mut self, template: JinjaTemplate) -> Self {
        self.register(template);
        self
    }

    pub fn register_all(&mut self, templates: impl IntoIterator<Item = JinjaTemplate>) {
        for template in templates {
            self.register(template);
        }
    }

    pub fn get(&self, name: &str) -> Option<&JinjaTemplate> {
        self.templates.get(name)
    }

    pub fn render(&self, name: &str, vars: &Value) -> Result<String> {
        self.get(name)
            .ok_or_else(|| PromptError::Unknown(name.to_string()))?
            .render(vars)
    }

    /// Sorted template names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
