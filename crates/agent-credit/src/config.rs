//! Settings for credit assessment runs

use crate::error::{CreditError, Result};
use agent_llm::{ProviderConfig, ProviderKind};
use agent_utils::EnvSnapshot;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_HF_API_BASE: &str = "https://router.huggingface.co/v1";

/// Resolved, immutable settings
///
/// Built from an [`EnvSnapshot`]; a reload builds a new value instead of
/// changing an existing one.
#[derive(Clone, PartialEq)]
pub struct AgentSettings {
    /// Provider of the primary tier
    pub default_provider: ProviderKind,

    /// Gemini API key
    pub google_api_key: Option<String>,

    /// HuggingFace access token
    pub hf_api_token: Option<String>,

    /// Primary Gemini model
    pub gemini_model: String,

    /// Gemini model used as first fallback behind HuggingFace
    pub gemini_power_model: String,

    /// Low-latency Gemini model used as last resort
    pub gemini_lite_model: String,

    /// HuggingFace model
    pub hf_model: String,

    /// Gemini REST base URL
    pub gemini_api_base: String,

    /// HuggingFace router base URL
    pub hf_api_base: String,

    /// Remote scoring endpoint
    pub ml_api_url: String,

    /// Timeout for scoring calls
    pub ml_api_timeout: Duration,

    /// Time each model tier gets before it counts as failed
    pub model_timeout: Duration,

    /// CSV file holding company records
    pub company_data_path: PathBuf,

    /// Optional directory of prompt overrides
    pub prompts_dir: Option<PathBuf>,

    /// Maximum node executions per assessment
    pub max_steps: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::Gemini,
            google_api_key: None,
            hf_api_token: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_power_model: "gemini-1.5-pro".to_string(),
            gemini_lite_model: "gemini-1.5-flash-8b".to_string(),
            hf_model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            hf_api_base: DEFAULT_HF_API_BASE.to_string(),
            ml_api_url: "http://localhost:8000/predict".to_string(),
            ml_api_timeout: Duration::from_secs(5),
            model_timeout: Duration::from_secs(60),
            company_data_path: PathBuf::from("artifacts/data_ingestion/val.csv"),
            prompts_dir: None,
            max_steps: 25,
        }
    }
}

impl AgentSettings {
    /// Resolve settings from a snapshot, falling back to defaults
    pub fn from_env(env: &EnvSnapshot) -> Result<Self> {
        let defaults = Self::default();

        let default_provider = match env.get("DEFAULT_LLM_PROVIDER") {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .map_err(|e| CreditError::Config(format!("DEFAULT_LLM_PROVIDER: {e}")))?,
            None => defaults.default_provider,
        };

        let secs = |key: &str, default: Duration| -> Result<Duration> {
            Ok(env
                .parse::<u64>(key)?
                .map_or(default, Duration::from_secs))
        };

        Ok(Self {
            default_provider,
            google_api_key: env.get("GOOGLE_API_KEY").map(str::to_string),
            hf_api_token: env.get("HUGGINGFACEHUB_API_TOKEN").map(str::to_string),
            gemini_model: env.get_or("GEMINI_MODEL", &defaults.gemini_model),
            gemini_power_model: env.get_or("GEMINI_POWER_MODEL", &defaults.gemini_power_model),
            gemini_lite_model: env.get_or("GEMINI_LITE_MODEL", &defaults.gemini_lite_model),
            hf_model: env.get_or("HF_MODEL", &defaults.hf_model),
            gemini_api_base: env.get_or("GEMINI_API_BASE", &defaults.gemini_api_base),
            hf_api_base: env.get_or("HF_API_BASE", &defaults.hf_api_base),
            ml_api_url: env.get_or("ML_API_URL", &defaults.ml_api_url),
            ml_api_timeout: secs("ML_API_TIMEOUT_SECS", defaults.ml_api_timeout)?,
            model_timeout: secs("MODEL_TIMEOUT_SECS", defaults.model_timeout)?,
            company_data_path: env
                .get("COMPANY_DATA_PATH")
                .map_or(defaults.company_data_path, PathBuf::from),
            prompts_dir: env.get("PROMPTS_DIR").map(PathBuf::from),
            max_steps: env.parse("AGENT_MAX_STEPS")?.unwrap_or(defaults.max_steps),
        })
    }

    /// Read the `.env` file and process environment, then resolve and validate
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        let settings = Self::from_env(&EnvSnapshot::load(env_file)?)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check settings that would otherwise fail in the middle of a run
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("ML_API_URL", &self.ml_api_url),
            ("GEMINI_API_BASE", &self.gemini_api_base),
            ("HF_API_BASE", &self.hf_api_base),
        ] {
            url::Url::parse(value)
                .map_err(|e| CreditError::Config(format!("{key} '{value}' is not a valid URL: {e}")))?;
        }

        if self.ml_api_timeout.is_zero() {
            return Err(CreditError::Config(
                "ML_API_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.model_timeout.is_zero() {
            return Err(CreditError::Config(
                "MODEL_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_steps == 0 {
            return Err(CreditError::Config(
                "AGENT_MAX_STEPS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether a credential for `provider` is configured
    pub fn has_credentials(&self, provider: ProviderKind) -> bool {
        match provider {
            ProviderKind::Gemini => self.google_api_key.is_some(),
            ProviderKind::HuggingFace => self.hf_api_token.is_some(),
        }
    }

    /// Credentials and endpoints handed to the model factory
    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new()
            .with_gemini_api_base(&self.gemini_api_base)
            .with_hf_api_base(&self.hf_api_base)
            .with_timeout(self.model_timeout.as_secs());

        if let Some(key) = &self.google_api_key {
            config = config.with_google_api_key(key);
        }
        if let Some(token) = &self.hf_api_token {
            config = config.with_hf_api_token(token);
        }
        config
    }
}

impl fmt::Debug for AgentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSettings")
            .field("default_provider", &self.default_provider)
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "***"))
            .field("hf_api_token", &self.hf_api_token.as_ref().map(|_| "***"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_power_model", &self.gemini_power_model)
            .field("gemini_lite_model", &self.gemini_lite_model)
            .field("hf_model", &self.hf_model)
            .field("ml_api_url", &self.ml_api_url)
            .field("company_data_path", &self.company_data_path)
            .field("prompts_dir", &self.prompts_dir)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}
