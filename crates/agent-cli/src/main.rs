//! Command-line interface for credit risk assessments
//!
//! ```bash
//! export GOOGLE_API_KEY=...
//! credit-agent check
//! credit-agent assess --company-id 1 --company-id 7 --output reports/
//! ```

mod output;

use agent_credit::reload::Snapshot;
use agent_credit::store::TableCache;
use agent_credit::{
    AgentSettings, CreditAssessment, HotReloadSettings, SettingsProvider, StaticSettings, tiers,
};
use agent_runtime::TIER_NAMES;
use agent_utils::LogFormat;
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use futures::future::join_all;
use output::{ConsoleObserver, ConsoleToolEvents};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "credit-agent")]
#[command(version, about = "Multi-agent credit risk assessment", long_about = None)]
struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, ignore_case = true, default_value = "text")]
    log_format: LogFormat,

    /// Read settings from this .env file before the process environment
    #[arg(long, global = true, env = "AGENT_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assess one or more companies concurrently
    Assess {
        /// Company id from the backing store (repeatable)
        #[arg(short, long = "company-id", required = true)]
        company_id: Vec<i64>,

        /// Re-read settings and prompts before every agent step
        #[arg(long)]
        hot_reload: bool,

        /// Write each report to <DIR>/credit_report_<id>.md
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Resolve settings and show which model tiers are available
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    agent_utils::init_tracing_with(cli.log_format);

    match cli.command {
        Commands::Assess {
            company_id,
            hot_reload,
            output,
        } => assess(cli.env_file, &company_id, hot_reload, output).await,
        Commands::Check => check(cli.env_file),
    }
}

async fn assess(
    env_file: Option<PathBuf>,
    company_ids: &[i64],
    hot_reload: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let provider: Arc<dyn SettingsProvider> = if hot_reload {
        info!("Hot reload enabled");
        Arc::new(HotReloadSettings::new(env_file)?)
    } else {
        Arc::new(StaticSettings::load(env_file.as_deref())?)
    };

    let snapshot = provider.snapshot().await?;
    if snapshot.tiers.is_empty() {
        bail!("No model tier could be initialized; set GOOGLE_API_KEY or HUGGINGFACEHUB_API_TOKEN");
    }

    let assessment = CreditAssessment::builder(provider)
        .tool_events(Arc::new(ConsoleToolEvents))
        .build()
        .await
        .context("Failed to build the assessment graph")?;

    let observers: Vec<ConsoleObserver> = company_ids
        .iter()
        .map(|id| ConsoleObserver::new(id.to_string()))
        .collect();
    let runs = company_ids
        .iter()
        .zip(&observers)
        .map(|(id, observer)| assessment.assess_with_observer(id.to_string(), observer));

    let mut results = Vec::with_capacity(company_ids.len());
    for (id, outcome) in company_ids.iter().zip(join_all(runs).await) {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => error!(company_id = id, error = %err, "Assessment failed"),
        }
    }

    for result in &results {
        println!("\n===== Company {} =====\n", result.company_id);
        println!("{}", result.report);

        if let Some(dir) = &output {
            let path = output::write_report(dir, result).await?;
            println!("\n📄 Report saved to {}", path.display());
        }
    }

    println!("\n{}", output::summary_table(&results));

    if results.len() < company_ids.len() {
        bail!(
            "{} of {} assessments failed",
            company_ids.len() - results.len(),
            company_ids.len()
        );
    }
    Ok(())
}

fn check(env_file: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = AgentSettings::load(env_file.as_deref())?;
    let plan = tiers::plan(&settings);
    let snapshot = Snapshot::build(settings, 1, &TableCache::default())?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Tier", "Provider", "Model", "Status"]);
    for (rank, planned) in plan.iter().enumerate() {
        let status = if snapshot.tiers.get(rank).is_some() {
            "ready"
        } else {
            "unavailable"
        };
        table.add_row(vec![
            TIER_NAMES[rank].to_string(),
            planned.provider.to_string(),
            planned.model.clone(),
            status.to_string(),
        ]);
    }
    println!("{table}");

    let settings = &snapshot.settings;
    println!("Company data: {}", settings.company_data_path.display());
    println!("Scoring service: {}", settings.ml_api_url);
    if let Some(dir) = &settings.prompts_dir {
        println!("Prompt overrides: {}", dir.display());
    }
    println!("Tools: {}", snapshot.tools.names().join(", "));

    if snapshot.tiers.is_empty() {
        bail!("No model tier could be initialized; set GOOGLE_API_KEY or HUGGINGFACEHUB_API_TOKEN");
    }
    Ok(())
}
