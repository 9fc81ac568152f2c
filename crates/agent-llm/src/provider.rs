//! Backend seam for model calls

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A hosted model backend
///
/// Each implementation owns its HTTP client and wire format. Handles are
/// shared across concurrent assessments, so `complete` takes `&self`.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short backend id used in logs, such as `gemini`
    fn name(&self) -> &str;
}
