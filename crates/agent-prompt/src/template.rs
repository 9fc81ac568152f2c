use crate::{PromptError, Result};
use minijinja::Environment;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A named Jinja template, compiled once on construction
///
/// The compiled form lives in a private environment holding only this
/// template, so clones share it and rendering never re-parses the source.
#[derive(Clone)]
pub struct JinjaTemplate {
    name: String,
    source: String,
    env: Arc<Environment<'static>>,
}

impl JinjaTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template_owned(name.clone(), source.clone())
            .map_err(|e| PromptError::Syntax {
                name: name.clone(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            name,
            source,
            env: Arc::new(env),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render with the fields of `vars` as top-level variables
    pub fn render(&self, vars: &Value) -> Result<String> {
        self.env
            .get_template(&self.name)
            .and_then(|template| template.render(minijinja::Value::from_serialize(vars)))
            .map_err(|e| PromptError::Render {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }
}

impl PartialEq for JinjaTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.source == other.source
    }
}

impl Eq for JinjaTemplate {}

impl fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
