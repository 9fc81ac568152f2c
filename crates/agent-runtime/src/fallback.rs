//! Tiered model invocation
//!
//! [`invoke_with_fallback`] walks up to three ranked model handles strictly
//! in order and returns the first successful response. Every outcome is a
//! message: when all tiers fail, or none is configured, the caller receives a
//! synthetic assistant message describing what happened.

use agent_llm::{Message, ModelHandle, Role, ToolDefinition};
use std::fmt;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Display names of the tiers, by rank
pub const TIER_NAMES: [&str; 3] = ["Primary", "1st Fallback", "2nd Fallback"];

const MAX_ERROR_CHARS: usize = 300;

/// Ranked model handles; absent entries failed to initialize
#[derive(Clone, Default)]
pub struct ModelTiers {
    tiers: [Option<ModelHandle>; 3],
}

impl ModelTiers {
    /// Create tiers from primary, first and second fallback
    pub fn new(
        primary: Option<ModelHandle>,
        fallback: Option<ModelHandle>,
        lite: Option<ModelHandle>,
    ) -> Self {
        Self {
            tiers: [primary, fallback, lite],
        }
    }

    /// Tier at `rank`, if present
    pub fn get(&self, rank: usize) -> Option<&ModelHandle> {
        self.tiers.get(rank).and_then(Option::as_ref)
    }

    /// Iterate over all slots in rank order
    pub fn iter(&self) -> impl Iterator<Item = Option<&ModelHandle>> {
        self.tiers.iter().map(Option::as_ref)
    }

    /// Number of present tiers
    pub fn present(&self) -> usize {
        self.tiers.iter().flatten().count()
    }

    /// Whether no tier is present
    pub fn is_empty(&self) -> bool {
        self.present() == 0
    }

    /// Bind tools on every present tier
    ///
    /// Tiers that cannot call tools come back unchanged.
    pub fn bind_tools(&self, tools: &[ToolDefinition]) -> Self {
        if tools.is_empty() {
            return self.clone();
        }
        Self {
            tiers: self
                .tiers
                .clone()
                .map(|tier| tier.map(|handle| handle.bind_tools(tools))),
        }
    }
}

impl fmt::Debug for ModelTiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for tier in &self.tiers {
            list.entry(&tier.as_ref().map(ModelHandle::id));
        }
        list.finish()
    }
}

/// Settings for one fallback walk
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// Time allowed for each tier before it counts as failed
    pub timeout: Duration,
}

impl FallbackConfig {
    /// Create a config with the given per-tier timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of a fallback walk
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    /// Model response, or the synthetic failure message
    pub response: Message,
    /// Fallback and failure notices, in the order they happened
    pub log: Vec<Message>,
    /// Rank of the tier that answered
    pub answered_by: Option<usize>,
    /// Detailed description of every tier failure
    pub failures: Vec<String>,
}

impl FallbackOutcome {
    /// Whether some tier produced the response
    pub fn succeeded(&self) -> bool {
        self.answered_by.is_some()
    }

    /// Log entries followed by the response, ready to append to a conversation
    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = self.log;
        messages.push(self.response);
        messages
    }
}

/// Fold system instructions into the last non-system message
///
/// All system contents are joined into one instruction block which wraps the
/// payload of the last remaining message. That message keeps its role and
/// tool linkage, except a plain assistant turn, which becomes a user turn.
/// Without any non-system message the result is a single user message
/// holding the instructions.
pub fn merge_instructions(inputs: &[Message]) -> Vec<Message> {
    let system_text = inputs
        .iter()
        .filter(|m| m.is_system())
        .map(Message::text_content)
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut rest: Vec<Message> = inputs.iter().filter(|m| !m.is_system()).cloned().collect();

    let Some(last) = rest.pop() else {
        return vec![Message::user(system_text)];
    };

    let merged = format!(
        "### ROLE & GUIDELINES ###\n{system_text}\n### CURRENT DATA & CONTEXT ###\n{}\n\nASSISTANCE_READY: True\nRESPONSE STRUCTURE: Follow mandatory sections strictly.",
        last.text_content()
    );

    rest.push(if last.role == Role::Assistant && !last.has_tool_calls() {
        Message::user(merged)
    } else {
        last.with_text(merged)
    });
    rest
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_ERROR_CHARS).collect();
    format!("{head}...")
}

/// Invoke tiers in rank order until one succeeds
///
/// Non-primary tiers, and any tier without native system-role support,
/// receive the conversation with instructions merged in. A tier failure or
/// timeout is logged and the next tier is tried; nothing is raised.
#[instrument(skip(tiers, inputs, config), fields(role = %role_name, tiers = tiers.present()))]
pub async fn invoke_with_fallback(
    tiers: &ModelTiers,
    inputs: &[Message],
    role_name: &str,
    config: &FallbackConfig,
) -> FallbackOutcome {
    let mut log = Vec::new();
    let mut failures = Vec::new();

    for (rank, tier) in tiers.iter().enumerate() {
        let Some(handle) = tier else {
            continue;
        };
        let tier_name = TIER_NAMES[rank];
        let model = handle.id();

        let messages = if rank > 0 || !handle.capabilities().system_role {
            merge_instructions(inputs)
        } else {
            inputs.to_vec()
        };

        info!(tier = tier_name, model, "{} calling {}", role_name, tier_name);
        if rank > 0 {
            log.push(Message::system(format!(
                "🔄 Falling back to {tier_name} ({model})..."
            )));
        }

        let error = match tokio::time::timeout(config.timeout, handle.invoke(messages)).await {
            Ok(Ok(response)) => {
                return FallbackOutcome {
                    response: response.message,
                    log,
                    answered_by: Some(rank),
                    failures,
                };
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("timed out after {}s", config.timeout.as_secs_f32()),
        };

        let detail = format!(
            "Tier {} ({tier_name} - {model}) failed: {}",
            rank + 1,
            truncate(&error)
        );
        warn!(tier = tier_name, model, error = %error, "{}: {}", role_name, detail);
        log.push(Message::system(format!("⚠️ {tier_name} ({model}) failed.")));
        failures.push(detail);
    }

    let response = if failures.is_empty() {
        warn!("{}: no model tiers available", role_name);
        Message::assistant("System Error: No models available.")
    } else {
        Message::assistant(format!("Error: All tiers failed.\n{}", failures.join("\n")))
    };

    FallbackOutcome {
        response,
        log,
        answered_by: None,
        failures,
    }
}
