//! Company record lookup

use crate::store::{CompanyStore, StoreError};
use agent_tools::args::integer;
use agent_tools::{Result, Tool, ToolError, parse_arguments, schema_of};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, instrument};

/// Fetches the raw record of a company from the internal database
pub struct FetchCompanyDataTool {
    store: CompanyStore,
}

impl FetchCompanyDataTool {
    /// Create a lookup tool over `store`
    pub fn new(store: CompanyStore) -> Self {
        Self { store }
    }
}

/// Arguments of the tools that work on one company
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompanyArgs {
    /// ID of the company (id_empresa)
    #[serde(deserialize_with = "integer")]
    #[schemars(with = "i64")]
    pub company_id: i64,
}

#[async_trait]
impl Tool for FetchCompanyDataTool {
    #[instrument(skip(self, params), fields(path = %self.store.path().display()))]
    async fn execute(&self, params: Value) -> Result<String> {
        let CompanyArgs { company_id } = parse_arguments(self.name(), params)?;

        match self.store.find(company_id).await {
            Ok(Some(record)) => Ok(record.render()),
            Ok(None) => Err(ToolError::failed(format!(
                "Company ID {company_id} not found."
            ))),
            Err(err @ StoreError::Missing(_)) => Err(ToolError::failed(err.to_string())),
            Err(err) => {
                error!(company_id, error = %err, "Error fetching company data");
                Err(ToolError::failed(format!("Failed to fetch data. {err}")))
            }
        }
    }

    fn name(&self) -> &'static str {
        "fetch_company_data"
    }

    fn description(&self) -> &'static str {
        "Fetches financial data for a company by its ID (id_empresa) from the internal database. \
         Returns a mapping of financial metrics or an error message if not found. \
         Useful for the Financial Analyst to get raw data before calculating ratios."
    }

    fn input_schema(&self) -> Value {
        schema_of::<CompanyArgs>()
    }
}
