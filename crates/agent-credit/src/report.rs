//! Risk score extraction and recommendation bands

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

// Only a line that starts with the label counts, so "Sector Risk Score:" is ignored.
static RISK_SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:[-*>#]+[ \t]*)?(?:\*\*)?[ \t]*(?:SYSTEM_FINAL_RISK_SCORE|Risk[ \t]+Score)(?:\*\*)?[ \t]*:[ \t]*(?:\*\*)?[ \t]*\[?[ \t]*(\d+(?:\.\d+)?)",
    )
    .expect("risk score pattern is a valid regex")
});

/// Extract the risk score from a report, on a 0-100 scale
///
/// The last line opening with `Risk Score:` (or `SYSTEM_FINAL_RISK_SCORE:`)
/// wins. A decimal below one with a fractional part, such as `0.35`, is read
/// as a fraction; `1` and `1.0` are literal scores.
pub fn extract_risk_score(report: &str) -> Option<f64> {
    let raw = RISK_SCORE
        .captures_iter(report)
        .filter_map(|caps| caps.get(1))
        .last()?
        .as_str();

    let mut value: f64 = raw.parse().ok()?;
    if value < 1.0 && raw.contains('.') {
        value *= 100.0;
    }
    Some(value.clamp(0.0, 100.0))
}

/// Lending decision derived from a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

impl Recommendation {
    /// Band a 0-100 score: below 30 approve, from 70 reject
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::Approve
        } else if score < 70.0 {
            Self::Review
        } else {
            Self::Reject
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Review => "REVIEW",
            Self::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
