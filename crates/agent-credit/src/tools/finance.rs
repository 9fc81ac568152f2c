//! Financial ratio calculators
//!
//! The model does arithmetic badly, so every ratio it reports comes from one
//! of these tools. A zero denominator is an error result, never `inf`.

use agent_tools::args::number;
use agent_tools::{Result, Tool, ToolError, parse_arguments, schema_of};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// How the two operands are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// `numerator / denominator`, rounded to two decimals
    Quotient,
    /// Relative change in percent, formatted with two decimals
    Growth,
}

/// Arguments of a two-operand ratio, plus how the ratio is presented
pub trait Ratio: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const FORMULA: Formula;
    /// Denominator as named in division-by-zero errors
    const DENOMINATOR: &'static str;

    /// `(numerator, denominator)`
    fn operands(&self) -> (f64, f64);
}

/// Debt-to-Equity ratio
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DebtToEquity {
    /// Total Liabilities
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub total_liabilities: f64,
    /// Shareholders Equity
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub shareholders_equity: f64,
}

impl Ratio for DebtToEquity {
    const NAME: &'static str = "calculate_debt_to_equity";
    const DESCRIPTION: &'static str = "Calculates the Debt-to-Equity ratio.";
    const FORMULA: Formula = Formula::Quotient;
    const DENOMINATOR: &'static str = "Shareholders Equity";

    fn operands(&self) -> (f64, f64) {
        (self.total_liabilities, self.shareholders_equity)
    }
}

/// EBITDA margin
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EbitdaMargin {
    /// Earnings Before Interest, Taxes, Depreciation, and Amortization
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub ebitda: f64,
    /// Total Revenue
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub revenue: f64,
}

impl Ratio for EbitdaMargin {
    const NAME: &'static str = "calculate_ebitda_margin";
    const DESCRIPTION: &'static str = "Calculates the EBITDA margin.";
    const FORMULA: Formula = Formula::Quotient;
    const DENOMINATOR: &'static str = "Revenue";

    fn operands(&self) -> (f64, f64) {
        (self.ebitda, self.revenue)
    }
}

/// Current ratio
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CurrentRatio {
    /// Current Assets
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub current_assets: f64,
    /// Current Liabilities
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub current_liabilities: f64,
}

impl Ratio for CurrentRatio {
    const NAME: &'static str = "calculate_current_ratio";
    const DESCRIPTION: &'static str = "Calculates the Current Ratio.";
    const FORMULA: Formula = Formula::Quotient;
    const DENOMINATOR: &'static str = "Current Liabilities";

    fn operands(&self) -> (f64, f64) {
        (self.current_assets, self.current_liabilities)
    }
}

/// Year-over-year revenue growth
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RevenueGrowth {
    /// Revenue of the current period
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub current: f64,
    /// Revenue of the previous period
    #[serde(deserialize_with = "number")]
    #[schemars(with = "f64")]
    pub previous: f64,
}

impl Ratio for RevenueGrowth {
    const NAME: &'static str = "calculate_revenue_growth";
    const DESCRIPTION: &'static str =
        "Calculates the revenue growth between two periods as a percentage.";
    const FORMULA: Formula = Formula::Growth;
    const DENOMINATOR: &'static str = "Previous Revenue";

    fn operands(&self) -> (f64, f64) {
        (self.current, self.previous)
    }
}

/// A two-operand financial ratio exposed as a tool
pub struct RatioTool<R> {
    ratio: PhantomData<fn() -> R>,
}

impl<R: Ratio> RatioTool<R> {
    pub const fn new() -> Self {
        Self { ratio: PhantomData }
    }

    /// Compute the ratio text for two operands
    pub fn compute(&self, numerator: f64, denominator: f64) -> Result<String> {
        if denominator == 0.0 {
            return Err(ToolError::division_by_zero(R::DENOMINATOR));
        }

        let value = match R::FORMULA {
            Formula::Quotient => round2(numerator / denominator),
            Formula::Growth => (numerator - denominator) / denominator.abs() * 100.0,
        };
        if !value.is_finite() {
            return Err(ToolError::failed(format!(
                "{} is out of range for {} and {}",
                R::NAME,
                numerator,
                denominator
            )));
        }

        Ok(match R::FORMULA {
            Formula::Quotient => format!("{value:?}"),
            Formula::Growth => format!("{value:.2}%"),
        })
    }
}

impl<R: Ratio> Default for RatioTool<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every ratio tool, in the order they are offered to the model
pub fn all() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(RatioTool::<DebtToEquity>::new()),
        Arc::new(RatioTool::<EbitdaMargin>::new()),
        Arc::new(RatioTool::<CurrentRatio>::new()),
        Arc::new(RatioTool::<RevenueGrowth>::new()),
    ]
}

/// Round half away from zero to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl<R: Ratio> Tool for RatioTool<R> {
    async fn execute(&self, params: Value) -> Result<String> {
        let args: R = parse_arguments(R::NAME, params)?;
        let (numerator, denominator) = args.operands();
        self.compute(numerator, denominator)
    }

    fn name(&self) -> &'static str {
        R::NAME
    }

    fn description(&self) -> &'static str {
        R::DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        schema_of::<R>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool<R: Ratio>() -> RatioTool<R> {
        RatioTool::new()
    }

    #[test]
    fn test_quotients_round_to_two_decimals() {
        assert_eq!(tool::<DebtToEquity>().compute(2.0, 3.0).unwrap(), "0.67");
        assert_eq!(tool::<CurrentRatio>().compute(400.0, 200.0).unwrap(), "2.0");
        assert_eq!(
            tool::<EbitdaMargin>().compute(1_000_000.0, 5_000_000.0).unwrap(),
            "0.2"
        );
        assert_eq!(tool::<DebtToEquity>().compute(-5.0, 4.0).unwrap(), "-1.25");
    }

    #[test]
    fn test_growth_is_percentage() {
        let growth = tool::<RevenueGrowth>();
        assert_eq!(growth.compute(110.0, 100.0).unwrap(), "10.00%");
        assert_eq!(growth.compute(50.0, 200.0).unwrap(), "-75.00%");
        assert_eq!(growth.compute(-50.0, -100.0).unwrap(), "50.00%");
    }

    fn assert_zero_denominator<R: Ratio>(expected: &str) {
        let ratio = tool::<R>();
        assert_eq!(ratio.compute(10.0, 0.0).unwrap_err().to_string(), expected);
        assert_eq!(ratio.compute(10.0, -0.0).unwrap_err().to_string(), expected);
    }

    #[test]
    fn test_zero_denominators() {
        assert_zero_denominator::<DebtToEquity>("Division by zero (Shareholders Equity is 0)");
        assert_zero_denominator::<EbitdaMargin>("Division by zero (Revenue is 0)");
        assert_zero_denominator::<CurrentRatio>("Division by zero (Current Liabilities is 0)");
        assert_zero_denominator::<RevenueGrowth>("Division by zero (Previous Revenue is 0)");
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(tool::<CurrentRatio>().compute(f64::MAX, 1e-300).is_err());
    }

    #[test]
    fn test_schema_lists_operands() {
        let schema = tool::<EbitdaMargin>().input_schema();
        assert_eq!(schema["required"], json!(["ebitda", "revenue"]));
        assert_eq!(schema["properties"]["revenue"]["type"], "number");
        assert_eq!(schema["properties"]["revenue"]["description"], "Total Revenue");
    }

    #[test]
    fn test_all_in_offer_order() {
        let names: Vec<String> = all().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(
            names,
            [
                "calculate_debt_to_equity",
                "calculate_ebitda_margin",
                "calculate_current_ratio",
                "calculate_revenue_growth",
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_reads_named_fields() {
        let output = tool::<DebtToEquity>()
            .execute(json!({ "total_liabilities": 660.0, "shareholders_equity": 1000.0 }))
            .await
            .unwrap();
        assert_eq!(output, "0.66");
    }

    #[tokio::test]
    async fn test_execute_accepts_numeric_strings() {
        let output = tool::<CurrentRatio>()
            .execute(json!({ "current_assets": "300", "current_liabilities": 150 }))
            .await
            .unwrap();
        assert_eq!(output, "2.0");
    }

    #[tokio::test]
    async fn test_execute_rejects_missing_operand() {
        let err = tool::<EbitdaMargin>()
            .execute(json!({ "ebitda": 10.0 }))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for 'calculate_ebitda_margin': missing field `revenue`"
        );
    }

    #[test]
    fn test_execute_blocking_growth() {
        let output = tokio_test::block_on(
            tool::<RevenueGrowth>().execute(json!({ "current": 120.0, "previous": 100.0 })),
        )
        .unwrap();
        assert_eq!(output, "20.00%");
    }
}
