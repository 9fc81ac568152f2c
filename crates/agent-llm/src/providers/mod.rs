//! Concrete LLM provider implementations
//!
//! Each backend is behind its own feature flag; both are enabled by default.

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "huggingface")]
pub mod huggingface;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

#[cfg(feature = "huggingface")]
pub use huggingface::{HuggingFaceConfig, HuggingFaceProvider};
