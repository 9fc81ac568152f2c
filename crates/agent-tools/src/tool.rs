//! Tool trait definition

use crate::Result;
use agent_llm::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools that agents can execute
///
/// Tools are functions that LLM agents can call to interact with the world.
/// Each tool must provide a name, description, and JSON schema for its input.
/// Implementations usually describe their input with a typed struct
/// ([`schema_of`](crate::schema_of)) and read it back in [`Tool::execute`]
/// with [`parse_arguments`](crate::parse_arguments).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool
    ///
    /// # Arguments
    ///
    /// * `params` - Tool input as sent by the model, expected to match `input_schema`
    ///
    /// # Returns
    ///
    /// Human-readable result text
    async fn execute(&self, params: Value) -> Result<String>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry and match the name in ToolDefinition
    fn name(&self) -> &str;

    /// Get the tool's description
    ///
    /// This description helps the LLM understand when to use this tool
    fn description(&self) -> &str;

    /// Get the tool's input schema (JSON Schema format)
    ///
    /// # Example
    ///
    /// ```
    /// use agent_tools::schema_of;
    /// use schemars::JsonSchema;
    ///
    /// #[derive(JsonSchema)]
    /// struct MarginArgs {
    ///     ebitda: f64,
    ///     revenue: f64,
    /// }
    ///
    /// let schema = schema_of::<MarginArgs>();
    /// assert_eq!(schema["required"], serde_json::json!(["ebitda", "revenue"]));
    /// ```
    fn input_schema(&self) -> Value;

    /// Model-facing definition of this tool
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}
