//! Console progress, summary tables and report files

use agent_credit::{ConversationState, RunResult, Stage};
use agent_llm::{Message, Role};
use agent_runtime::ToolEventHandler;
use agent_workflow::StepObserver;
use anyhow::Context;
use async_trait::async_trait;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Prints fallback notices and finished agent turns of one run
pub struct ConsoleObserver {
    company_id: String,
}

impl ConsoleObserver {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
        }
    }
}

impl StepObserver<ConversationState, Stage> for ConsoleObserver {
    fn on_step(&self, _step: usize, stage: Stage, update: &Vec<Message>) {
        for message in update {
            if message.is_system() {
                println!("[{}] {}", self.company_id, message.text_content());
            } else if message.role == Role::Assistant && !message.has_tool_calls() {
                println!("[{}] ✅ {stage} finished", self.company_id);
            }
        }
    }
}

/// Prints every tool call as it starts
pub struct ConsoleToolEvents;

#[async_trait]
impl ToolEventHandler for ConsoleToolEvents {
    async fn on_tool_start(&self, _id: &str, name: &str, _input: &Value) {
        println!("🔧 Executing `{name}`");
    }
}

/// One row per assessment
pub fn summary_table(results: &[RunResult]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Company",
            "Risk Score",
            "Recommendation",
            "Steps",
            "Fallbacks",
            "Finished",
        ]);

    for result in results {
        table.add_row(vec![
            result.company_id.clone(),
            result
                .risk_score
                .map_or_else(|| "n/a".to_string(), |score| format!("{score:.0}")),
            result
                .recommendation
                .map_or_else(|| "n/a".to_string(), |r| r.to_string()),
            if result.completed {
                result.steps.to_string()
            } else {
                format!("{} (limit)", result.steps)
            },
            result.fallback_events.to_string(),
            result.finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]);
    }
    table
}

/// Path of the Markdown report for `company_id` inside `dir`
pub fn report_path(dir: &Path, company_id: &str) -> PathBuf {
    dir.join(format!("credit_report_{company_id}.md"))
}

/// Write the report of `result` into `dir`
pub async fn write_report(dir: &Path, result: &RunResult) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = report_path(dir, &result.company_id);
    tokio::fs::write(&path, format!("{}\n", result.report))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
