//! LLM provider abstraction layer
//!
//! This crate provides provider-agnostic abstractions for interacting with
//! Large Language Models (LLMs). It includes:
//!
//! - Message types for LLM communication
//! - Completion request/response types
//! - Tool definitions for function calling
//! - Provider trait for LLM implementations
//! - Model handles with construction-time capabilities
//! - A factory building handles for the Gemini and HuggingFace backends

pub mod completion;
pub mod error;
pub mod factory;
pub mod handle;
pub mod messages;
pub mod provider;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use factory::{ProviderConfig, ProviderKind, get_model};
pub use handle::{ModelCapabilities, ModelHandle};
pub use messages::{ContentBlock, Message, MessageContent, Role, ToolCall};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;

// Provider implementations (feature-gated)
#[cfg(any(feature = "gemini", feature = "huggingface"))]
pub mod providers;
