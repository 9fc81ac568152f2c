//! Tool registry for managing available tools
//!
//! The registry is built once at startup and then only read. Agents receive
//! subsets through [`ToolRegistry::select`]; subsets share the underlying
//! tool instances.

use crate::{Result, Tool, ToolError};
use agent_llm::ToolDefinition;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Ordered registry of tools keyed by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// Names are unique; registering the same name twice is an error.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Register a tool, builder style
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Check whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Model-facing definitions in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Build a registry holding only the named tools, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut subset = Self::new();
        for name in names {
            let tool = self.get(name).ok_or_else(|| self.unknown(name))?;
            subset.register(tool)?;
        }
        Ok(subset)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool
    ///
    /// Never fails: unknown tools, invalid arguments and tool failures all
    /// come back as text starting with `Error: `.
    #[instrument(skip(self, arguments), fields(tool = %name))]
    pub async fn dispatch(&self, name: &str, arguments: Value) -> String {
        match self.try_dispatch(name, arguments).await {
            Ok(output) => {
                debug!(bytes = output.len(), "Tool completed");
                output
            }
            Err(err) => {
                warn!(error = %err, "Tool returned an error");
                format!("Error: {err}")
            }
        }
    }

    async fn try_dispatch(&self, name: &str, arguments: Value) -> Result<String> {
        let tool = self.get(name).ok_or_else(|| self.unknown(name))?;
        tool.execute(arguments).await
    }

    fn unknown(&self, name: &str) -> ToolError {
        ToolError::UnknownTool {
            name: name.to_string(),
            available: self.names().join(", "),
        }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_arguments, schema_of};
    use async_trait::async_trait;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct RatioArgs {
        a: f64,
        b: f64,
    }

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        #[serde(default)]
        text: String,
    }

    struct Ratio;

    #[async_trait]
    impl Tool for Ratio {
        async fn execute(&self, params: Value) -> Result<String> {
            let RatioArgs { a, b } = parse_arguments(self.name(), params)?;
            if b == 0.0 {
                return Err(ToolError::division_by_zero("B"));
            }
            Ok(format!("{:.2}", a / b))
        }

        fn name(&self) -> &'static str {
            "ratio"
        }

        fn description(&self) -> &'static str {
            "Divide a by b"
        }

        fn input_schema(&self) -> Value {
            schema_of::<RatioArgs>()
        }
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        async fn execute(&self, params: Value) -> Result<String> {
            let EchoArgs { text } = parse_arguments(self.name(), params)?;
            Ok(text)
        }

        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo text"
        }

        fn input_schema(&self) -> Value {
            schema_of::<EchoArgs>()
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Arc::new(Ratio))
            .unwrap()
            .with_tool(Arc::new(Echo))
            .unwrap()
    }

    #[test]
    fn test_registration_order_and_duplicates() {
        let mut registry = registry();
        assert_eq!(registry.names(), vec!["ratio", "echo"]);
        assert_eq!(registry.definitions()[1].name, "echo");
        assert_eq!(registry.definitions()[0].required_fields(), vec!["a", "b"]);

        let err = registry.register(Arc::new(Echo)).unwrap_err();
        assert_eq!(err, ToolError::DuplicateTool("echo".to_string()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_select_subset() {
        let registry = registry();
        let subset = registry.select(&["echo"]).unwrap();
        assert_eq!(subset.names(), vec!["echo"]);
        assert!(!subset.contains("ratio"));

        assert!(registry.select(&["missing"]).is_err());
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let output = registry().dispatch("ratio", json!({ "a": 1, "b": 4 })).await;
        assert_eq!(output, "0.25");
    }

    #[tokio::test]
    async fn test_dispatch_errors_are_text() {
        let registry = registry();

        let output = registry.dispatch("ratio", json!({ "a": 1, "b": 0 })).await;
        assert_eq!(output, "Error: Division by zero (B is 0)");

        let output = registry.dispatch("nope", json!({})).await;
        assert_eq!(output, "Error: Unknown tool 'nope'. Available tools: ratio, echo");

        let output = registry.dispatch("ratio", json!({ "a": 1 })).await;
        assert_eq!(
            output,
            "Error: Invalid arguments for 'ratio': missing field `b`"
        );

        let output = registry.dispatch("ratio", json!({ "a": 1, "b": "two" })).await;
        assert!(output.starts_with("Error: Invalid arguments for 'ratio': invalid type: string \"two\""));
    }

    #[test]
    fn test_dispatch_blocking() {
        let output = tokio_test::block_on(registry().dispatch("echo", json!({ "text": "hi" })));
        assert_eq!(output, "hi");
    }
}
