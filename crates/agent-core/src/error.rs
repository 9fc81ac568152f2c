//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Node or component initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Node processing failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Configuration(String),
}
