//! Model handle construction
//!
//! [`get_model`] is the single entry point that turns a provider kind plus a
//! model identifier into a [`ModelHandle`]. Credentials and endpoints come
//! from an explicit [`ProviderConfig`] rather than the process environment
//! so that every reconfiguration snapshot builds from its own values.

use crate::{LLMError, ModelCapabilities, ModelHandle, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Supported model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Google Gemini REST API
    Gemini,
    /// HuggingFace inference router
    HuggingFace,
}

impl ProviderKind {
    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::HuggingFace => "huggingface",
        }
    }

    /// Capabilities of models served by this backend
    pub fn capabilities(self) -> ModelCapabilities {
        match self {
            Self::Gemini => ModelCapabilities::NATIVE,
            Self::HuggingFace => ModelCapabilities::new(true, false),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(LLMError::ConfigurationError(format!(
                "Unsupported provider: {other}"
            ))),
        }
    }
}

/// Credentials and endpoints for every backend
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Gemini API key
    pub google_api_key: Option<String>,
    /// HuggingFace access token
    pub hf_api_token: Option<String>,
    /// Override for the Gemini REST base URL
    pub gemini_api_base: Option<String>,
    /// Override for the HuggingFace router base URL
    pub hf_api_base: Option<String>,
    /// HTTP timeout applied by the provider clients, in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Gemini API key
    pub fn with_google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    /// Set the HuggingFace token
    pub fn with_hf_api_token(mut self, token: impl Into<String>) -> Self {
        self.hf_api_token = Some(token.into());
        self
    }

    /// Set the Gemini base URL
    pub fn with_gemini_api_base(mut self, base: impl Into<String>) -> Self {
        self.gemini_api_base = Some(base.into());
        self
    }

    /// Set the HuggingFace base URL
    pub fn with_hf_api_base(mut self, base: impl Into<String>) -> Self {
        self.hf_api_base = Some(base.into());
        self
    }

    /// Set the HTTP timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }
}

fn require(value: Option<&String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| LLMError::ConfigurationError(format!("{name} is not configured")))
}

/// Build a model handle for `provider` serving `model_name`
///
/// Fails with [`LLMError::ConfigurationError`] when the credential for the
/// provider is missing or the provider was not compiled in.
pub fn get_model(
    provider: ProviderKind,
    model_name: &str,
    config: &ProviderConfig,
) -> Result<ModelHandle> {
    debug!(%provider, model = model_name, "Building model handle");

    match provider {
        ProviderKind::Gemini => gemini_handle(model_name, config),
        ProviderKind::HuggingFace => huggingface_handle(model_name, config),
    }
}

#[cfg(feature = "gemini")]
fn gemini_handle(model_name: &str, config: &ProviderConfig) -> Result<ModelHandle> {
    use crate::providers::{GeminiConfig, GeminiProvider};
    use std::sync::Arc;

    let mut gemini = GeminiConfig::new(require(config.google_api_key.as_ref(), "GOOGLE_API_KEY")?);
    if let Some(base) = &config.gemini_api_base {
        gemini = gemini.with_api_base(base.clone());
    }
    if let Some(timeout) = config.timeout_secs {
        gemini = gemini.with_timeout(timeout);
    }

    let provider = GeminiProvider::with_config(gemini)?;
    Ok(ModelHandle::new(
        model_name,
        Arc::new(provider),
        ProviderKind::Gemini.capabilities(),
    ))
}

#[cfg(not(feature = "gemini"))]
fn gemini_handle(_model_name: &str, config: &ProviderConfig) -> Result<ModelHandle> {
    require(config.google_api_key.as_ref(), "GOOGLE_API_KEY")?;
    Err(LLMError::ConfigurationError(
        "Gemini support is not compiled in".to_string(),
    ))
}

#[cfg(feature = "huggingface")]
fn huggingface_handle(model_name: &str, config: &ProviderConfig) -> Result<ModelHandle> {
    use crate::providers::{HuggingFaceConfig, HuggingFaceProvider};
    use std::sync::Arc;

    let mut hf = HuggingFaceConfig::new(require(
        config.hf_api_token.as_ref(),
        "HUGGINGFACEHUB_API_TOKEN",
    )?);
    if let Some(base) = &config.hf_api_base {
        hf = hf.with_api_base(base.clone());
    }
    if let Some(timeout) = config.timeout_secs {
        hf = hf.with_timeout(timeout);
    }

    let provider = HuggingFaceProvider::with_config(hf)?;
    Ok(ModelHandle::new(
        model_name,
        Arc::new(provider),
        ProviderKind::HuggingFace.capabilities(),
    )
    .with_max_tokens(512))
}

#[cfg(not(feature = "huggingface"))]
fn huggingface_handle(_model_name: &str, config: &ProviderConfig) -> Result<ModelHandle> {
    require(config.hf_api_token.as_ref(), "HUGGINGFACEHUB_API_TOKEN")?;
    Err(LLMError::ConfigurationError(
        "HuggingFace support is not compiled in".to_string(),
    ))
}
