//! The credit assessment state machine
//!
//! ```text
//! FinancialAnalyst ──tool calls──▶ FinancialTools ──▶ FinancialAnalyst
//!        │ no calls
//!        ▼
//! DataScientist ──tool calls──▶ MlTools ──▶ DataScientist
//!        │ no calls
//!        ▼
//! Orchestrator ──▶ Terminal
//! ```
//!
//! A failed model turn is still a message, so every run ends with a report
//! unless the step limit cuts it short.

use crate::agents::{AgentRole, RoleAgent, ToolNode};
use crate::error::Result;
use crate::prompts::ASSESSMENT_REQUEST;
use crate::reload::SettingsProvider;
use crate::report::{Recommendation, extract_risk_score};
use crate::state::ConversationState;
use agent_llm::Message;
use agent_runtime::ToolEventHandler;
use agent_workflow::{NoOpObserver, StateGraph, StepObserver};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

/// Node keys of the assessment graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    FinancialAnalyst,
    FinancialTools,
    DataScientist,
    MlTools,
    Orchestrator,
    Terminal,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::FinancialAnalyst => "Financial Analyst",
            Self::FinancialTools => "Financial Tools",
            Self::DataScientist => "Data Scientist",
            Self::MlTools => "ML Tools",
            Self::Orchestrator => "CRO",
            Self::Terminal => "Terminal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Next stage after the Financial Analyst's turn
pub fn route_financial_analyst(state: &ConversationState) -> Stage {
    if state.has_pending_tool_calls() {
        Stage::FinancialTools
    } else {
        Stage::DataScientist
    }
}

/// Next stage after the Data Scientist's turn
pub fn route_data_scientist(state: &ConversationState) -> Stage {
    if state.has_pending_tool_calls() {
        Stage::MlTools
    } else {
        Stage::Orchestrator
    }
}

/// Wire roles and tool nodes into the assessment graph
pub fn build_graph(
    provider: &Arc<dyn SettingsProvider>,
    tool_events: Option<&Arc<dyn ToolEventHandler>>,
    max_steps: usize,
) -> Result<StateGraph<ConversationState, Stage>> {
    let agent = |role| Arc::new(RoleAgent::new(role, Arc::clone(provider)));
    let tools = |role| {
        let node = ToolNode::new(role, Arc::clone(provider));
        Arc::new(match tool_events {
            Some(handler) => node.with_event_handler(Arc::clone(handler)),
            None => node,
        })
    };

    let graph = StateGraph::<ConversationState, Stage>::builder(Stage::FinancialAnalyst, Stage::Terminal)
        .add_node(Stage::FinancialAnalyst, agent(AgentRole::FinancialAnalyst))
        .add_node(Stage::FinancialTools, tools(AgentRole::FinancialAnalyst))
        .add_node(Stage::DataScientist, agent(AgentRole::DataScientist))
        .add_node(Stage::MlTools, tools(AgentRole::DataScientist))
        .add_node(Stage::Orchestrator, agent(AgentRole::Orchestrator))
        .add_conditional_edge(Stage::FinancialAnalyst, route_financial_analyst)
        .add_edge(Stage::FinancialTools, Stage::FinancialAnalyst)
        .add_conditional_edge(Stage::DataScientist, route_data_scientist)
        .add_edge(Stage::MlTools, Stage::DataScientist)
        .add_edge(Stage::Orchestrator, Stage::Terminal)
        .max_steps(max_steps)
        .build()?;

    Ok(graph)
}

/// Messages appended by one executed node
#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    pub step: usize,
    pub stage: Stage,
    pub appended: Vec<Message>,
}

/// Observer forwarding every step to a channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: UnboundedSender<StepEvent>,
}

impl ChannelObserver {
    pub fn new(sender: UnboundedSender<StepEvent>) -> Self {
        Self { sender }
    }
}

impl StepObserver<ConversationState, Stage> for ChannelObserver {
    fn on_step(&self, step: usize, stage: Stage, update: &Vec<Message>) {
        let event = StepEvent {
            step,
            stage,
            appended: update.clone(),
        };
        if self.sender.send(event).is_err() {
            warn!(step, %stage, "Step receiver dropped");
        }
    }
}

/// Outcome of one assessment
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub company_id: String,
    /// Final report, or a note explaining why there is none
    pub report: String,
    /// Score parsed from the report, 0-100
    pub risk_score: Option<f64>,
    pub recommendation: Option<Recommendation>,
    /// Full conversation in order
    pub messages: Vec<Message>,
    /// Executed nodes
    pub steps: usize,
    /// Fallback and tier failure notices
    pub fallback_events: usize,
    /// Whether the orchestrator finished within the step limit
    pub completed: bool,
    pub finished_at: DateTime<Utc>,
}

/// Runs assessments over a shared graph
///
/// Cloning is cheap; clones share the graph and the settings provider, and
/// every run owns its own conversation state.
#[derive(Clone)]
pub struct CreditAssessment {
    graph: Arc<StateGraph<ConversationState, Stage>>,
    provider: Arc<dyn SettingsProvider>,
}

impl CreditAssessment {
    pub fn builder(provider: Arc<dyn SettingsProvider>) -> CreditAssessmentBuilder {
        CreditAssessmentBuilder::new(provider)
    }

    /// Step limit of every run
    pub fn max_steps(&self) -> usize {
        self.graph.max_steps()
    }

    /// Assess one company
    pub async fn assess(&self, company_id: impl Into<String>) -> Result<RunResult> {
        self.assess_with_observer(company_id, &NoOpObserver).await
    }

    /// Assess one company, reporting every step to `observer`
    #[instrument(skip(self, company_id, observer), fields(company_id))]
    pub async fn assess_with_observer(
        &self,
        company_id: impl Into<String>,
        observer: &dyn StepObserver<ConversationState, Stage>,
    ) -> Result<RunResult> {
        let company_id = company_id.into();
        tracing::Span::current().record("company_id", company_id.as_str());

        let snapshot = self.provider.snapshot().await?;
        let request = snapshot
            .prompts
            .render(ASSESSMENT_REQUEST, &json!({ "company_id": company_id }))?;
        let state = ConversationState::new(company_id.clone(), Message::user(request));

        let run = self.graph.run_with_observer(state, observer).await?;
        let steps = run.steps();

        let report = if run.completed {
            run.state
                .last_message()
                .map(Message::text_content)
                .unwrap_or_default()
        } else {
            format!("Error: Assessment stopped after {steps} steps without a final report.")
        };

        let risk_score = if run.completed {
            extract_risk_score(&report)
        } else {
            None
        };
        let recommendation = risk_score.map(Recommendation::from_score);
        let fallback_events = run.state.system_notices();

        info!(
            steps,
            completed = run.completed,
            fallback_events,
            risk_score = ?risk_score,
            "Assessment finished"
        );

        Ok(RunResult {
            company_id,
            report,
            risk_score,
            recommendation,
            messages: run.state.messages,
            steps,
            fallback_events,
            completed: run.completed,
            finished_at: Utc::now(),
        })
    }
}

impl fmt::Debug for CreditAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditAssessment")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CreditAssessment`]
pub struct CreditAssessmentBuilder {
    provider: Arc<dyn SettingsProvider>,
    tool_events: Option<Arc<dyn ToolEventHandler>>,
    max_steps: Option<usize>,
}

impl CreditAssessmentBuilder {
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self {
            provider,
            tool_events: None,
            max_steps: None,
        }
    }

    /// Report tool starts and completions to `handler`
    pub fn tool_events(mut self, handler: Arc<dyn ToolEventHandler>) -> Self {
        self.tool_events = Some(handler);
        self
    }

    /// Override the configured step limit
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub async fn build(self) -> Result<CreditAssessment> {
        let max_steps = match self.max_steps {
            Some(limit) => limit,
            None => self.provider.snapshot().await?.settings.max_steps,
        };
        let graph = build_graph(&self.provider, self.tool_events.as_ref(), max_steps)?;

        Ok(CreditAssessment {
            graph: Arc::new(graph),
            provider: self.provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentSettings;
    use crate::reload::{Snapshot, StaticSettings};
    use crate::store::TableCache;
    use agent_core::State;
    use agent_llm::ToolCall;

    fn provider() -> Arc<dyn SettingsProvider> {
        let snapshot = Snapshot::build(AgentSettings::default(), 1, &TableCache::default()).unwrap();
        Arc::new(StaticSettings::new(snapshot))
    }

    fn with_last(message: Message) -> ConversationState {
        let mut state = ConversationState::new("1", Message::user("assess 1"));
        state.apply(vec![message]);
        state
    }

    #[test]
    fn test_routing_follows_tool_calls() {
        let calling = with_last(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("c1", "fetch_company_data", json!({ "company_id": 1 }))],
        ));
        let answering = with_last(Message::assistant("done"));

        assert_eq!(route_financial_analyst(&calling), Stage::FinancialTools);
        assert_eq!(route_financial_analyst(&answering), Stage::DataScientist);
        assert_eq!(route_data_scientist(&calling), Stage::MlTools);
        assert_eq!(route_data_scientist(&answering), Stage::Orchestrator);
    }

    #[test]
    fn test_graph_edges() {
        let graph = build_graph(&provider(), None, 25).unwrap();
        let state = with_last(Message::assistant("done"));

        assert_eq!(graph.entry(), Stage::FinancialAnalyst);
        assert_eq!(graph.next(Stage::FinancialTools, &state), Some(Stage::FinancialAnalyst));
        assert_eq!(graph.next(Stage::MlTools, &state), Some(Stage::DataScientist));
        assert_eq!(graph.next(Stage::Orchestrator, &state), Some(Stage::Terminal));
        assert_eq!(graph.next(Stage::Terminal, &state), None);
    }

    #[tokio::test]
    async fn test_run_without_models_still_reports() {
        let assessment = CreditAssessment::builder(provider()).build().await.unwrap();
        assert_eq!(assessment.max_steps(), AgentSettings::default().max_steps);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let result = assessment
            .assess_with_observer("9", &ChannelObserver::new(tx))
            .await
            .unwrap();

        assert!(result.completed);
        assert_eq!(result.steps, 3);
        assert_eq!(result.report, "System Error: No models available.");
        assert_eq!(result.risk_score, None);
        assert_eq!(result.messages.len(), 4);
        assert_eq!(
            result.messages[0].text_content(),
            "Please assess credit risk for Company ID 9."
        );

        let stages: Vec<Stage> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::FinancialAnalyst, Stage::DataScientist, Stage::Orchestrator]
        );
    }

    #[tokio::test]
    async fn test_step_limit_yields_incomplete_report() {
        let assessment = CreditAssessment::builder(provider())
            .max_steps(2)
            .build()
            .await
            .unwrap();

        let result = assessment.assess("9").await.unwrap();
        assert!(!result.completed);
        assert_eq!(result.steps, 2);
        assert_eq!(
            result.report,
            "Error: Assessment stopped after 2 steps without a final report."
        );
        assert_eq!(result.recommendation, None);
    }
}
