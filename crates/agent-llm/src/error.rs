//! Model construction and invocation errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LLMError>;

/// Failure of a model handle
///
/// Inside a fallback walk every variant only marks the tier as failed; the
/// `Display` text ends up, truncated, in the failure notice.
#[derive(Error, Debug)]
pub enum LLMError {
    /// Non-success status without a more specific variant
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// 401 or 403 from the provider
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The provider rejected the payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Transport failure, including client-side timeouts
    #[cfg(any(feature = "gemini", feature = "huggingface"))]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The body parsed but holds no usable answer (blocked, empty, malformed)
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Missing credentials or an unknown provider; raised before any call
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<LLMError> for agent_core::Error {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::ConfigurationError(msg) => agent_core::Error::Configuration(msg),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}
