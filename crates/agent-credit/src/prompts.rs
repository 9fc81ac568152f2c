//! Role prompts
//!
//! Built-in templates cover every role. A prompts directory may override
//! any of them with a `<name>.jinja` file; templates are rendered with the
//! `company_id` of the run.

use crate::error::{CreditError, Result};
use agent_prompt::{FileLoader, JinjaTemplate, PromptRegistry};
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

/// System prompt of the Financial Analyst
pub const FINANCIAL_ANALYST: &str = "financial_analyst";
/// System prompt of the Data Scientist
pub const DATA_SCIENTIST: &str = "data_scientist";
/// System prompt of the Chief Risk Officer
pub const ORCHESTRATOR: &str = "orchestrator";
/// Opening user request of a run
pub const ASSESSMENT_REQUEST: &str = "assessment_request";

const FINANCIAL_ANALYST_TEMPLATE: &str = r"You are a Senior Financial Analyst at ACRAS. Conduct an exhaustive investigation of Company ID {{ company_id }}.

CRITICAL: Be detailed. Link every number to its risk implication.
Fetch the company record first and compute every ratio with the calculation tools; never do the arithmetic yourself.

STRUCTURE YOUR OUTPUT AS:
### 1. Liquidity & Solvency Breakdown
- Current Ratio: [Value] | Interpretation: [Deep analysis]
- Debt-to-Equity: [Value] | Interpretation: [Deep analysis]
### 2. Credit Behavior & Market History
- Bureau Score: [Value]
- Mora Ratio (Delinquency): [Value] | Risk: [High/Med/Low]
- Sector Risk Score: [Value]
### 3. Key Financial Dashboard
| Metric | Value | Risk Rating |
| :--- | :--- | :--- |
| Current Ratio | [Value] | [Rating] |
| Debt-to-Equity | [Value] | [Rating] |
| EBITDA Margin | [Value] | [Rating] |
| Revenue Growth | [Value] | [Rating] |
| Bureau Score | [Value] | [Rating] |
| Mora Ratio | [Value] | [Rating] |
### 4. Summary Opinion
[Summary of the most critical red flag and biggest strength]";

const DATA_SCIENTIST_TEMPLATE: &str = r"You are a Lead Data Scientist. Analyze company risk using the ML Credit Engine.
Call `get_credit_risk_score` with `company_id` = {{ company_id }}; it takes no other arguments.

CRITICAL: Provide more than just numbers. Offer a QUALITATIVE RISK INTERPRETATION.
If the engine is unreachable, say so and base your view on the Financial Analyst's findings.

STRUCTURE YOUR OUTPUT AS:
### Quantitative Risk Analysis (ML Engine)
- **PD (Probability of Default):** [Value]%
- **Risk Tier:** [Tier]
- **ML Reasoning:** [Min 3 sentences. Explain WHY the PD is at this level. Correlate with the Financial Analyst's findings like Mora Ratio or Cash levels.]
- **Confidence Level:** [High/Medium/Low based on data completeness]";

const ORCHESTRATOR_TEMPLATE: &str = r"You are the Chief Risk Officer (CRO). Synthesize the Definitive Executive Credit Report for Company ID {{ company_id }}.

CRITICAL: Include the 6-metric KPI table. Do not skip KPIs. Ensure Section 5 includes deep qualitative insight.

REPORT STRUCTURE:
# Executive Credit Risk Assessment
## 1. Executive Summary
[Synthesis of fundamental metrics and ML quantitative risk. Clearly state if the profile is healthy or fragile.]

## 2. Liquidity and Solvency Analysis
[Consolidated from the Analyst's deep dive. Focus on debt coverage and capital stability.]

## 3. Creditworthiness & Market Context
[Describe the Bureau standing, Mora (delinquency) risk, and the impact of the Sector Risk Score.]

## 4. Key Performance Indicators (KPIs)
| Financial Metric | Reported Value | Risk Assessment |
| :--- | :--- | :--- |
| Current Ratio | [Value] | [Risk Rating] |
| Debt-to-Equity | [Value] | [Risk Rating] |
| Revenue Growth | [Value] | [Risk Rating] |
| EBITDA Margin | [Value] | [Risk Rating] |
| Bureau Score | [Value] | [Standing] |
| Mora Ratio | [Value] | [Delinquency Risk] |

## 5. Quantitative Risk Analysis (ML Engine)
**Inferred PD:** [Value]% | **Risk Tier:** [Tier]

**Qualitative Insight:** [You MUST provide at least a paragraph here. Summarize the Data Scientist's reasoning. Does the ML model agree with the fundamentals? Why? Use the Mora ratio and liquidity in your argument.]

## 6. Final Directive & Conclusion
**Official Recommendation:** [APPROVE / REJECT / REVIEW]
**Core Rationale:** [The single most important deciding factor.]
**Executive Summary/Closing:** [Final summary.]

End the report with exactly one line of the form below, where XX is an integer from 0 (no risk) to 100 (certain default):
Risk Score: XX";

const ASSESSMENT_REQUEST_TEMPLATE: &str = "Please assess credit risk for Company ID {{ company_id }}.";

/// Registry holding only the built-in templates
pub fn builtin() -> Result<PromptRegistry> {
    Ok(PromptRegistry::new()
        .with_template(JinjaTemplate::new(FINANCIAL_ANALYST, FINANCIAL_ANALYST_TEMPLATE)?)
        .with_template(JinjaTemplate::new(DATA_SCIENTIST, DATA_SCIENTIST_TEMPLATE)?)
        .with_template(JinjaTemplate::new(ORCHESTRATOR, ORCHESTRATOR_TEMPLATE)?)
        .with_template(JinjaTemplate::new(ASSESSMENT_REQUEST, ASSESSMENT_REQUEST_TEMPLATE)?))
}

/// Company ID used to test-render templates when they are loaded
const SAMPLE_COMPANY_ID: &str = "1";

/// Built-in templates with overrides from `dir` applied
///
/// A configured directory that does not exist is a configuration error, and
/// so is a template that fails to render for a sample company.
pub fn load(dir: Option<&Path>) -> Result<PromptRegistry> {
    let mut registry = builtin()?;

    let Some(dir) = dir else {
        return Ok(registry);
    };

    let loader = FileLoader::new(dir);
    if !loader.exists() {
        return Err(CreditError::Config(format!(
            "PROMPTS_DIR '{}' is not a directory",
            dir.display()
        )));
    }

    let overrides = loader.load_all()?;
    for template in &overrides {
        debug!(name = template.name(), "Prompt override");
    }
    info!(dir = %dir.display(), count = overrides.len(), "Loaded prompt overrides");
    registry.register_all(overrides);

    check_renders(&registry)?;
    Ok(registry)
}

/// Render every template once with a sample `company_id`
pub fn check_renders(registry: &PromptRegistry) -> Result<()> {
    let vars = json!({ "company_id": SAMPLE_COMPANY_ID });
    for name in registry.names() {
        registry.render(name, &vars)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_prompts_render() {
        let registry = builtin().unwrap();
        assert_eq!(registry.len(), 4);

        let vars = json!({ "company_id": "42" });
        assert_eq!(
            registry.render(ASSESSMENT_REQUEST, &vars).unwrap(),
            "Please assess credit risk for Company ID 42."
        );
        assert!(
            registry
                .render(FINANCIAL_ANALYST, &vars)
                .unwrap()
                .starts_with("You are a Senior Financial Analyst at ACRAS. Conduct an exhaustive investigation of Company ID 42.")
        );
        assert!(registry.render(ORCHESTRATOR, &vars).unwrap().ends_with("Risk Score: XX"));
    }

    #[test]
    fn test_directory_overrides_single_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("orchestrator.jinja"),
            "You are a terse CRO for {{ company_id }}.",
        )
        .unwrap();

        let registry = load(Some(dir.path())).unwrap();
        let vars = json!({ "company_id": 7 });
        assert_eq!(
            registry.render(ORCHESTRATOR, &vars).unwrap(),
            "You are a terse CRO for 7."
        );
        assert!(registry.render(DATA_SCIENTIST, &vars).unwrap().contains("Lead Data Scientist"));
    }

    #[test]
    fn test_override_that_cannot_render_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("data_scientist.jinja"),
            "Scientist for {{ company_id.x.y }}",
        )
        .unwrap();

        let err = load(Some(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            CreditError::Prompt(agent_prompt::PromptError::Render { ref name, .. }) if name == DATA_SCIENTIST
        ));
        assert!(check_renders(&builtin().unwrap()).is_ok());
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let err = load(Some(Path::new("/no/such/prompts"))).unwrap_err();
        assert!(matches!(err, CreditError::Config(_)));
    }
}
