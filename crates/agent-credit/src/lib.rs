//! Credit risk assessment agents
//!
//! Three roles share one conversation: a Financial Analyst who pulls the
//! company record and computes ratios, a Data Scientist who queries the
//! scoring service, and a Chief Risk Officer who writes the final report.
//! Each role answers through tiered model fallback, and tool calls loop back
//! to the role that made them.
//!
//! ```no_run
//! use agent_credit::{CreditAssessment, StaticSettings};
//! use std::sync::Arc;
//!
//! # async fn demo() -> agent_credit::Result<()> {
//! let provider = Arc::new(StaticSettings::load(None)?);
//! let assessment = CreditAssessment::builder(provider).build().await?;
//!
//! let result = assessment.assess("42").await?;
//! println!("{}", result.report);
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod assessment;
pub mod config;
pub mod error;
pub mod prompts;
pub mod reload;
pub mod report;
pub mod state;
pub mod store;
pub mod tiers;
pub mod tools;

pub use agents::{AgentRole, RoleAgent, ToolNode};
pub use assessment::{
    ChannelObserver, CreditAssessment, CreditAssessmentBuilder, RunResult, Stage, StepEvent,
    build_graph, route_data_scientist, route_financial_analyst,
};
pub use config::AgentSettings;
pub use error::{CreditError, Result};
pub use reload::{HotReloadSettings, SettingsProvider, Snapshot, StaticSettings};
pub use report::{Recommendation, extract_risk_score};
pub use state::ConversationState;
pub use store::{CompanyRecord, CompanyStore, CompanyTable, StoreError, TableCache};
