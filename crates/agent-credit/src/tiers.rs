//! Model tier resolution
//!
//! Primary is the default provider's main model. The first fallback
//! switches provider: Gemini's power model behind HuggingFace, HuggingFace
//! behind Gemini. The last resort is always Gemini's lite model.

use crate::config::AgentSettings;
use agent_llm::{ProviderKind, get_model};
use agent_runtime::{ModelTiers, TIER_NAMES};
use tracing::{info, warn};

/// Provider and model planned for one tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPlan {
    /// Backend serving the tier
    pub provider: ProviderKind,
    /// Model identifier
    pub model: String,
}

/// Providers and models for the three tiers, in rank order
pub fn plan(settings: &AgentSettings) -> [TierPlan; 3] {
    let tier = |provider, model: &str| TierPlan {
        provider,
        model: model.to_string(),
    };

    let primary = match settings.default_provider {
        ProviderKind::Gemini => tier(ProviderKind::Gemini, &settings.gemini_model),
        ProviderKind::HuggingFace => tier(ProviderKind::HuggingFace, &settings.hf_model),
    };
    let fallback = match settings.default_provider {
        ProviderKind::HuggingFace => tier(ProviderKind::Gemini, &settings.gemini_power_model),
        ProviderKind::Gemini => tier(ProviderKind::HuggingFace, &settings.hf_model),
    };
    let lite = tier(ProviderKind::Gemini, &settings.gemini_lite_model);

    [primary, fallback, lite]
}

/// Build every tier; a tier that cannot be built is left absent
pub fn build(settings: &AgentSettings) -> ModelTiers {
    let config = settings.provider_config();
    let [primary, fallback, lite] = plan(settings).map(|planned| {
        get_model(planned.provider, &planned.model, &config)
            .inspect_err(|err| {
                warn!(provider = %planned.provider, model = %planned.model, error = %err, "Model tier unavailable");
            })
            .ok()
    });

    let tiers = ModelTiers::new(primary, fallback, lite);
    for (rank, handle) in tiers.iter().enumerate() {
        if let Some(handle) = handle {
            info!(tier = TIER_NAMES[rank], model = handle.id(), "Model tier ready");
        }
    }
    tiers
}
