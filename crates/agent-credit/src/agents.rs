//! Role agents and tool nodes
//!
//! A [`RoleAgent`] resolves a fresh [`Snapshot`](crate::reload::Snapshot)
//! on every run, prepends its rendered system prompt to the conversation and
//! asks the model tiers for the next turn. A [`ToolNode`] answers the tool
//! calls of that turn with the role's tool subset.

use crate::error::CreditError;
use crate::prompts;
use crate::reload::SettingsProvider;
use crate::state::ConversationState;
use crate::tools::{FINANCIAL_TOOLS, ML_TOOLS};
use agent_core::{Node, Result};
use agent_llm::Message;
use agent_runtime::{FallbackConfig, ToolEventHandler, ToolExecutor, invoke_with_fallback};
use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Agent roles of an assessment, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    FinancialAnalyst,
    DataScientist,
    Orchestrator,
}

impl AgentRole {
    /// Name used in logs and fallback notices
    pub fn display_name(self) -> &'static str {
        match self {
            Self::FinancialAnalyst => "Financial Analyst",
            Self::DataScientist => "Data Scientist",
            Self::Orchestrator => "CRO",
        }
    }

    /// Prompt template holding the role's instructions
    pub fn prompt(self) -> &'static str {
        match self {
            Self::FinancialAnalyst => prompts::FINANCIAL_ANALYST,
            Self::DataScientist => prompts::DATA_SCIENTIST,
            Self::Orchestrator => prompts::ORCHESTRATOR,
        }
    }

    /// Tools the role may call; the orchestrator has none
    pub fn tools(self) -> &'static [&'static str] {
        match self {
            Self::FinancialAnalyst => &FINANCIAL_TOOLS,
            Self::DataScientist => &ML_TOOLS,
            Self::Orchestrator => &[],
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Node running one role against the model tiers
pub struct RoleAgent {
    role: AgentRole,
    provider: Arc<dyn SettingsProvider>,
}

impl RoleAgent {
    pub fn new(role: AgentRole, provider: Arc<dyn SettingsProvider>) -> Self {
        Self { role, provider }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }
}

#[async_trait]
impl Node<ConversationState> for RoleAgent {
    #[instrument(skip(self, state), fields(role = %self.role, company_id = %state.company_id))]
    async fn run(&self, state: &ConversationState) -> Result<Vec<Message>> {
        let snapshot = self.provider.snapshot().await?;

        let instructions = match snapshot
            .prompts
            .render(self.role.prompt(), &json!({ "company_id": state.company_id }))
        {
            Ok(instructions) => instructions,
            Err(err) => {
                warn!(error = %err, generation = snapshot.generation, "Role prompt failed to render");
                return Ok(vec![Message::assistant(format!("Error: {err}"))]);
            }
        };

        let definitions = if self.role.tools().is_empty() {
            Vec::new()
        } else {
            snapshot
                .tools
                .select(self.role.tools())
                .map_err(CreditError::from)?
                .definitions()
        };
        let tiers = snapshot.tiers.bind_tools(&definitions);

        let mut inputs = Vec::with_capacity(state.messages.len() + 1);
        inputs.push(Message::system(instructions));
        inputs.extend(state.messages.iter().cloned());

        debug!(
            generation = snapshot.generation,
            inputs = inputs.len(),
            tools = definitions.len(),
            "Invoking role"
        );

        let config = FallbackConfig::new(snapshot.settings.model_timeout);
        let outcome = invoke_with_fallback(&tiers, &inputs, self.role.display_name(), &config).await;

        info!(
            answered_by = ?outcome.answered_by,
            tool_calls = outcome.response.tool_calls().len(),
            "{} turn finished",
            self.role
        );
        Ok(outcome.into_messages())
    }

    fn name(&self) -> &str {
        self.role.display_name()
    }
}

/// Node executing the pending tool calls of a role
pub struct ToolNode {
    role: AgentRole,
    provider: Arc<dyn SettingsProvider>,
    event_handler: Option<Arc<dyn ToolEventHandler>>,
}

impl ToolNode {
    pub fn new(role: AgentRole, provider: Arc<dyn SettingsProvider>) -> Self {
        Self {
            role,
            provider,
            event_handler: None,
        }
    }

    /// Report tool starts and completions to `handler`
    pub fn with_event_handler(mut self, handler: Arc<dyn ToolEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }
}

#[async_trait]
impl Node<ConversationState> for ToolNode {
    #[instrument(skip(self, state), fields(role = %self.role))]
    async fn run(&self, state: &ConversationState) -> Result<Vec<Message>> {
        let Some(last) = state.last_message() else {
            return Ok(Vec::new());
        };

        let snapshot = self.provider.snapshot().await?;
        let registry = snapshot
            .tools
            .select(self.role.tools())
            .map_err(CreditError::from)?;

        let mut executor = ToolExecutor::new(Arc::new(registry));
        if let Some(handler) = &self.event_handler {
            executor = executor.with_event_handler(Arc::clone(handler));
        }
        Ok(executor.execute(last).await)
    }

    fn name(&self) -> &str {
        match self.role {
            AgentRole::FinancialAnalyst => "Financial Tools",
            AgentRole::DataScientist => "ML Tools",
            AgentRole::Orchestrator => "Orchestrator Tools",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentSettings;
    use crate::reload::{Snapshot, StaticSettings};
    use crate::store::TableCache;
    use agent_llm::{Role, ToolCall};
    use agent_prompt::JinjaTemplate;

    fn provider() -> Arc<dyn SettingsProvider> {
        let snapshot = Snapshot::build(AgentSettings::default(), 1, &TableCache::default()).unwrap();
        Arc::new(StaticSettings::new(snapshot))
    }

    fn provider_with_prompt(name: &str, source: &str) -> Arc<dyn SettingsProvider> {
        let settings = AgentSettings::default();
        let prompts = prompts::builtin()
            .unwrap()
            .with_template(JinjaTemplate::new(name, source).unwrap());
        let tools = crate::tools::build_registry(&settings, &TableCache::default()).unwrap();
        let tiers = crate::tiers::build(&settings);
        Arc::new(StaticSettings::new(Snapshot::new(1, settings, prompts, tiers, tools)))
    }

    #[test]
    fn test_role_tool_subsets() {
        assert_eq!(AgentRole::FinancialAnalyst.tools().len(), 5);
        assert_eq!(AgentRole::DataScientist.tools(), ["get_credit_risk_score"]);
        assert!(AgentRole::Orchestrator.tools().is_empty());
        assert_eq!(AgentRole::Orchestrator.to_string(), "CRO");
    }

    #[tokio::test]
    async fn test_agent_without_tiers_reports_no_models() {
        let agent = RoleAgent::new(AgentRole::Orchestrator, provider());
        let state = ConversationState::new("3", Message::user("assess 3"));

        let update = agent.run(&state).await.unwrap();
        assert_eq!(update, vec![Message::assistant("System Error: No models available.")]);
    }

    #[tokio::test]
    async fn test_prompt_render_failure_becomes_error_text() {
        let agent = RoleAgent::new(
            AgentRole::DataScientist,
            provider_with_prompt(prompts::DATA_SCIENTIST, "Scientist for {{ company_id.x.y }}"),
        );
        let state = ConversationState::new("3", Message::user("assess 3"));

        let update = agent.run(&state).await.unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].role, Role::Assistant);
        assert!(!update[0].has_tool_calls());
        assert!(update[0].text_content().starts_with("Error: Template 'data_scientist' failed to render"));
    }

    #[tokio::test]
    async fn test_tool_node_answers_every_call() {
        let node = ToolNode::new(AgentRole::FinancialAnalyst, provider());
        let mut state = ConversationState::new("3", Message::user("assess 3"));
        state.messages.push(Message::assistant_with_tool_calls(
            "",
            vec![
                ToolCall::new(
                    "a",
                    "calculate_current_ratio",
                    json!({ "current_assets": 200.0, "current_liabilities": 100.0 }),
                ),
                ToolCall::new("b", "get_credit_risk_score", json!({ "company_id": 3 })),
            ],
        ));

        let update = node.run(&state).await.unwrap();
        assert_eq!(update.len(), 2);
        assert_eq!(update[0].tool_result_id(), Some("a"));
        assert_eq!(update[0].text_content(), "2.0");
        // tools outside the role's subset are unknown to it
        assert_eq!(update[1].tool_result_id(), Some("b"));
        assert!(update[1].text_content().starts_with("Error: Unknown tool 'get_credit_risk_score'"));
    }
}
