//! Remote credit risk scoring
//!
//! Wraps the prediction service: the company record is turned into the
//! service's fixed payload and the response becomes a one-line summary.
//! Transport failures are reported as text so the agents can carry on
//! with a qualitative assessment.

use crate::error::Result as CreditResult;
use crate::store::{CompanyRecord, CompanyStore, StoreError};
use crate::tools::lookup::CompanyArgs;
use agent_tools::{Result, Tool, ToolError, parse_arguments, schema_of};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Payload fields sent to the service; `true` marks integer fields
pub const PAYLOAD_FIELDS: [(&str, bool); 20] = [
    ("ingresos", false),
    ("ebitda", false),
    ("activos_totales", false),
    ("pasivos_totales", false),
    ("patrimonio", false),
    ("caja", false),
    ("gastos_intereses", false),
    ("cuentas_cobrar", false),
    ("inventario", false),
    ("cuentas_pagar", false),
    ("sector_risk_score", false),
    ("years_operating", true),
    ("ratio_mora", false),
    ("ratio_utilizacion", false),
    ("revenue_growth", false),
    ("margen_beneficio", false),
    ("score_buro", true),
    ("ebitda_margin", false),
    ("debt_to_equity", false),
    ("current_ratio", false),
];

const UNREACHABLE: &str =
    "The ML Model API is currently unreachable. Proceed with qualitative analysis only.";

#[derive(Debug, Deserialize)]
struct Prediction {
    risk_level: Option<Value>,
    probability: Option<Value>,
}

/// Queries the prediction service for a quantitative risk assessment
pub struct CreditRiskScoreTool {
    store: CompanyStore,
    client: Client,
    url: String,
}

impl CreditRiskScoreTool {
    /// Create a scoring tool posting to `url` with the given timeout
    pub fn new(store: CompanyStore, url: impl Into<String>, timeout: Duration) -> CreditResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            store,
            client,
            url: url.into(),
        })
    }

    async fn prepare(&self, company_id: i64) -> Result<Value> {
        match self.store.find(company_id).await {
            Ok(Some(record)) => build_payload(&record).map_err(|detail| {
                error!(company_id, %detail, "Error preparing scoring payload");
                ToolError::failed(format!("Failed to prepare data. {detail}"))
            }),
            Ok(None) => Err(ToolError::failed(format!(
                "Company ID {company_id} not found."
            ))),
            Err(err @ StoreError::Missing(_)) => Err(ToolError::failed(err.to_string())),
            Err(err) => Err(ToolError::failed(format!("Failed to prepare data. {err}"))),
        }
    }

    async fn score(&self, payload: &Value) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() {
                    warn!(url = %self.url, error = %err, "Scoring service unreachable");
                    ToolError::failed(UNREACHABLE)
                } else {
                    unexpected(&err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Scoring service returned an error");
            return Err(ToolError::failed(format!(
                "The ML Model API returned an error: {status} {body}"
            )
            .trim_end()
            .to_string()));
        }

        let prediction: Prediction = response.json().await.map_err(|err| unexpected(&err))?;
        debug!(?prediction, "Scoring service responded");

        Ok(format!(
            "Risk Level: {}, Probability of Default: {}",
            display(prediction.risk_level.as_ref()),
            display(prediction.probability.as_ref())
        ))
    }
}

fn unexpected(err: &dyn std::fmt::Display) -> ToolError {
    ToolError::failed(format!(
        "An unexpected error occurred while querying the model: {err}"
    ))
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Build the scoring payload from a company record
pub fn build_payload(record: &CompanyRecord) -> std::result::Result<Value, String> {
    let mut payload = Map::with_capacity(PAYLOAD_FIELDS.len());
    for (field, integer) in PAYLOAD_FIELDS {
        let value = if integer {
            json!(record.integer(field)?)
        } else {
            json!(record.number(field)?)
        };
        payload.insert(field.to_string(), value);
    }
    Ok(Value::Object(payload))
}

#[async_trait]
impl Tool for CreditRiskScoreTool {
    #[instrument(skip(self, params), fields(url = %self.url))]
    async fn execute(&self, params: Value) -> Result<String> {
        let CompanyArgs { company_id } = parse_arguments(self.name(), params)?;
        let payload = self.prepare(company_id).await?;
        self.score(&payload).await
    }

    fn name(&self) -> &'static str {
        "get_credit_risk_score"
    }

    fn description(&self) -> &'static str {
        "Queries the Machine Learning API to get a quantitative credit risk assessment. \
         Returns a string containing the Risk Level (Low/Medium/High) and the Probability of Default."
    }

    fn input_schema(&self) -> Value {
        schema_of::<CompanyArgs>()
    }
}
