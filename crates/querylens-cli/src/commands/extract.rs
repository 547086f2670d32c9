use anyhow::Result;
use querylens_core::extract;

use crate::cli::OutputFormat;
use crate::input::read_records;
use crate::output::{print_json, print_statements};

pub fn extract_statements(file: &str, format: OutputFormat) -> Result<()> {
    let records = read_records(file)?;
    let statements = extract(&records);
    tracing::debug!(records = records.len(), statements = statements.len(), "Extracted statements");

    match format {
        OutputFormat::Json => print_json(&statements)?,
        OutputFormat::Table => print_statements(&statements),
    }
    Ok(())
}
