//! Model-facing tool descriptions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a model sees of a tool
///
/// Providers translate this into their own function-declaration format;
/// the executable half lives in the tool registry under the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names of the required input fields
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition_creation() {
        let schema = json!({
            "type": "object",
            "properties": { "company_id": { "type": "integer", "description": "ID of the company" } },
            "required": ["company_id"]
        });

        let tool = ToolDefinition::new("fetch_company_data", "Fetch a company record", schema.clone());
        assert_eq!(tool.name, "fetch_company_data");
        assert_eq!(tool.input_schema, schema);
        assert_eq!(tool.required_fields(), vec!["company_id"]);
    }
}
