//! Error types for credit assessment

use thiserror::Error;

/// Errors that can abort an assessment before or while it starts
///
/// Operational failures during a run (tool errors, model outages) never
/// surface here; they become conversation text.
#[derive(Debug, Error)]
pub enum CreditError {
    /// A setting is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The environment snapshot could not be read
    #[error(transparent)]
    Env(#[from] agent_utils::ConfigError),

    /// A prompt template failed to load or render
    #[error("Prompt error: {0}")]
    Prompt(#[from] agent_prompt::PromptError),

    /// The tool registry could not be assembled
    #[error("Tool registry error: {0}")]
    Tools(#[from] agent_tools::ToolError),

    /// The state machine is inconsistent or a node failed
    #[error("Workflow error: {0}")]
    Workflow(#[from] agent_workflow::WorkflowError),

    /// A blocking reload task panicked or was cancelled
    #[error("Reload task failed: {0}")]
    Join(String),

    /// An HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for credit operations
pub type Result<T> = std::result::Result<T, CreditError>;

impl From<CreditError> for agent_core::Error {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::Config(msg) => agent_core::Error::Configuration(msg),
            CreditError::Env(e) => agent_core::Error::Configuration(e.to_string()),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}
