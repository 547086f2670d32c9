use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use querylens_core::LogRecord;
use serde_json::Value;
use tracing::debug;

/// Reads log records from a JSON-lines file, or stdin for `-`.
pub fn read_records(path: &str) -> Result<Vec<LogRecord>> {
    let content = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?
    };
    Ok(parse_records(&content))
}

/// Parses one record per non-blank line.
///
/// A line holding `{"message": ..., "fields": {...}}` becomes a structured
/// record; anything else becomes a record whose message is the raw line.
pub fn parse_records(content: &str) -> Vec<LogRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            parse_line(line).unwrap_or_else(|| {
                debug!(line = number + 1, "Treating non-JSON line as a plain message");
                LogRecord::new(line)
            })
        })
        .collect()
}

fn parse_line(line: &str) -> Option<LogRecord> {
    let Value::Object(mut object) = serde_json::from_str::<Value>(line).ok()? else {
        return None;
    };
    let message = match object.remove("message")? {
        Value::String(message) => message,
        _ => return None,
    };
    let fields: HashMap<String, String> = match object.remove("fields") {
        Some(Value::Object(fields)) => fields
            .into_iter()
            .map(|(key, value)| (key, field_text(value)))
            .collect(),
        _ => HashMap::new(),
    };
    Some(LogRecord { message, fields })
}

fn field_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
