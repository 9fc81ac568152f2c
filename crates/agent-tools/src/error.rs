//! Error types for tool execution

use thiserror::Error;

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Failures raised by tools and the registry
///
/// The `Display` text is what the model sees, prefixed with `Error: ` by
/// [`ToolRegistry::dispatch`](crate::ToolRegistry::dispatch).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A ratio denominator was exactly zero
    #[error("Division by zero ({0} is 0)")]
    DivisionByZero(String),

    /// No tool with this name is registered
    #[error("Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    /// Arguments do not satisfy the tool's input schema
    #[error("Invalid arguments for '{tool}': {detail}")]
    InvalidArguments { tool: String, detail: String },

    /// A tool with this name was registered twice
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// Domain-specific failure with a ready-made message
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Build a [`ToolError::Failed`] from any message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Build a [`ToolError::DivisionByZero`] naming the zero operand
    pub fn division_by_zero(operand: impl Into<String>) -> Self {
        Self::DivisionByZero(operand.into())
    }
}
