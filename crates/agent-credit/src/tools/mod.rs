//! Credit assessment tools
//!
//! All six tools live in one registry; each role later selects the subset
//! it is allowed to call.

pub mod finance;
pub mod lookup;
pub mod scoring;

pub use finance::RatioTool;
pub use lookup::FetchCompanyDataTool;
pub use scoring::CreditRiskScoreTool;

use crate::config::AgentSettings;
use crate::error::Result;
use crate::store::{CompanyStore, TableCache};
use agent_tools::ToolRegistry;
use std::sync::Arc;

/// Tools available to the Financial Analyst
pub const FINANCIAL_TOOLS: [&str; 5] = [
    "fetch_company_data",
    "calculate_debt_to_equity",
    "calculate_ebitda_margin",
    "calculate_current_ratio",
    "calculate_revenue_growth",
];

/// Tools available to the Data Scientist
pub const ML_TOOLS: [&str; 1] = ["get_credit_risk_score"];

/// Build the registry holding every tool, configured from `settings`
pub fn build_registry(settings: &AgentSettings, cache: &TableCache) -> Result<ToolRegistry> {
    let store = CompanyStore::with_cache(&settings.company_data_path, cache.clone());

    let mut registry = ToolRegistry::new().with_tool(Arc::new(FetchCompanyDataTool::new(store.clone())))?;
    for ratio in finance::all() {
        registry.register(ratio)?;
    }
    registry.register(Arc::new(CreditRiskScoreTool::new(
        store,
        &settings.ml_api_url,
        settings.ml_api_timeout,
    )?))?;

    Ok(registry)
}
