use anyhow::Result;
use colored::Colorize;
use querylens_core::stats::repeated_queries;
use querylens_core::{extract, summarize};

use crate::cli::OutputFormat;
use crate::input::read_records;
use crate::output::{print_json, print_stats};

pub fn stats(
    file: &str,
    repeat_threshold: usize,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let statements = extract(&read_records(file)?);
    let mut stats = summarize(&statements, repeat_threshold);
    let repeated = repeated_queries(&stats).len();
    if let Some(top) = top {
        stats.truncate(top);
    }

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            print_stats(&stats);
            if repeated > 0 {
                println!(
                    "{} {} query shape(s) ran at least {} times; check for N+1 access patterns",
                    "!".yellow(),
                    repeated,
                    repeat_threshold
                );
            }
        }
    }
    Ok(())
}
