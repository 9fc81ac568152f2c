//! Callable model handles
//!
//! A [`ModelHandle`] pairs a provider with one model identifier, the
//! generation parameters used for every call, and the capabilities the
//! model was constructed with. Capabilities are decided once when the handle
//! is built and never re-derived from the model name afterwards.

use crate::{CompletionRequest, CompletionResponse, LLMProvider, Message, Result, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What a model supports natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// The model can emit structured tool calls
    pub tool_calling: bool,
    /// The model honours separate system-role turns
    pub system_role: bool,
}

impl ModelCapabilities {
    /// Full native support
    pub const NATIVE: Self = Self {
        tool_calling: true,
        system_role: true,
    };

    /// Create a capability set
    pub const fn new(tool_calling: bool, system_role: bool) -> Self {
        Self {
            tool_calling,
            system_role,
        }
    }
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// A ready-to-call model
///
/// Cloning is cheap; provider and tool list are shared. Binding tools
/// returns a new handle and leaves the original untouched, so handles can be
/// shared between concurrent runs.
#[derive(Clone)]
pub struct ModelHandle {
    id: String,
    provider: Arc<dyn LLMProvider>,
    capabilities: ModelCapabilities,
    max_tokens: usize,
    temperature: Option<f32>,
    tools: Arc<[ToolDefinition]>,
}

impl ModelHandle {
    /// Create a handle for `id` served by `provider`
    pub fn new(
        id: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        capabilities: ModelCapabilities,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            capabilities,
            max_tokens: 2048,
            temperature: Some(0.0),
            tools: Arc::from(Vec::new()),
        }
    }

    /// Set the maximum tokens generated per call
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature (`None` uses the provider default)
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Model identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capabilities decided at construction
    pub fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    /// Maximum tokens per call
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Tools bound to this handle
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Whether calls through this handle may produce tool calls
    pub fn is_tool_bound(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Bind tools so subsequent calls can emit tool calls
    ///
    /// Models without native tool calling get the handle back unchanged and
    /// stay tool-free; this never fails.
    pub fn bind_tools(&self, tools: &[ToolDefinition]) -> Self {
        if !self.capabilities.tool_calling {
            debug!(model = %self.id, "Model does not support tool calling, binding skipped");
            return self.clone();
        }

        Self {
            tools: Arc::from(tools.to_vec()),
            ..self.clone()
        }
    }

    /// Build the completion request for a conversation
    pub fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.id)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .tools(self.tools.to_vec());

        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }

        builder.build()
    }

    /// Invoke the model on a conversation
    pub async fn invoke(&self, messages: Vec<Message>) -> Result<CompletionResponse> {
        self.provider.complete(self.request(messages)).await
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
