//! Error types for graph construction and execution

use thiserror::Error;

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised while building or running a graph
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The graph definition is inconsistent
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// A router or edge pointed at a key with no node
    #[error("No node registered for '{0}'")]
    UnknownNode(String),

    /// A node returned an error
    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: agent_core::Error,
    },
}

impl From<WorkflowError> for agent_core::Error {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NodeFailed { source, .. } => source,
            WorkflowError::InvalidGraph(msg) => agent_core::Error::Configuration(msg),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}
