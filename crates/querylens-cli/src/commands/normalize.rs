use anyhow::Result;
use colored::Colorize;
use querylens_core::normalize::fingerprint;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::output::print_json;

pub fn normalize(sql: &str, format: OutputFormat) -> Result<()> {
    let (normalized, hash) = fingerprint(sql);
    match format {
        OutputFormat::Json => print_json(&json!({
            "normalized_query": normalized,
            "query_hash": hash,
        })),
        OutputFormat::Table => {
            println!("{}: {}", "Normalized".cyan(), normalized);
            println!("{}: {}", "Hash".cyan(), hash);
            Ok(())
        }
    }
}
