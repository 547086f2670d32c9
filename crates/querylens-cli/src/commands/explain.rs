use std::fs;

use anyhow::{Context, Result};
use querylens_core::explain::BatchOptions;
use querylens_core::{AdvisorConfig, IndexAdvisor, PlanRecord, Statement, explain_batch, extract};
use querylens_db_postgres::{ExplainMode, PostgresConfig, PostgresExplainer, mask_password};
use serde_json::json;
use tracing::info;

use crate::cli::OutputFormat;
use crate::input::read_records;
use crate::output::{print_batch_report, print_index_analysis, print_json, print_success};

pub struct ExplainRun<'a> {
    pub file: &'a str,
    pub database_url: String,
    pub options: BatchOptions,
    pub plan_only: bool,
    pub advisor: AdvisorConfig,
    pub output: Option<&'a str>,
}

pub fn postgres_config(url: &str, options: &BatchOptions, plan_only: bool) -> PostgresConfig {
    let mode = if plan_only {
        ExplainMode::PlanOnly
    } else {
        ExplainMode::Analyze
    };
    PostgresConfig::new(url)
        .with_pool_size(options.concurrency.max(1) as u32)
        .with_statement_timeout_ms(options.timeout_ms)
        .with_explain_mode(mode)
}

pub async fn explain(run: ExplainRun<'_>, format: OutputFormat) -> Result<()> {
    let mut statements = extract(&read_records(run.file)?);

    let config = postgres_config(&run.database_url, &run.options, run.plan_only);
    info!(url = %mask_password(&config.url), mode = ?config.explain_mode, "Connecting");
    let explainer = PostgresExplainer::connect(&config)
        .await
        .with_context(|| format!("Cannot connect to {}", mask_password(&config.url)))?;

    let report = explain_batch(&explainer, &mut statements, &run.options).await;
    let analysis = IndexAdvisor::new(run.advisor).analyze(&statements);

    if let Some(path) = run.output {
        let count = write_plan_records(path, &statements)?;
        if format == OutputFormat::Table {
            print_success(&format!("Wrote {count} plan record(s) to {path}"));
        }
    }

    match format {
        OutputFormat::Json => print_json(&json!({
            "report": report,
            "analysis": analysis,
        }))?,
        OutputFormat::Table => {
            print_batch_report(&report, &statements);
            print_index_analysis(&analysis);
        }
    }
    Ok(())
}

pub fn plan_records(statements: &[Statement]) -> Vec<PlanRecord> {
    statements.iter().filter_map(Statement::plan_record).collect()
}

fn write_plan_records(path: &str, statements: &[Statement]) -> Result<usize> {
    let records = plan_records(statements);
    let content = serde_json::to_string_pretty(&records)?;
    fs::write(path, content).with_context(|| format!("Failed to write {path}"))?;
    Ok(records.len())
}
