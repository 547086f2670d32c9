use anyhow::Result;
use querylens_core::{compare, extract};

use crate::cli::OutputFormat;
use crate::input::read_records;
use crate::output::{print_comparison, print_json};

pub fn compare_files(before: &str, after: &str, top: usize, format: OutputFormat) -> Result<()> {
    let set1 = extract(&read_records(before)?);
    let set2 = extract(&read_records(after)?);
    let result = compare(&set1, &set2);

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_comparison(&result, top),
    }
    Ok(())
}
