//! SQL statement extraction from structured log records.
//!
//! A record carries SQL evidence in one of two shapes, checked in order:
//!
//! 1. the message contains the [`SQL_MARKER`]; the statement is the text after it
//! 2. the `type` field equals `"query"`; the statement is the whole message
//!
//! The text is kept verbatim apart from the stripped marker prefix; a record
//! whose text is blank yields no statement.
//!
//! Anything else is ordinary application logging and is skipped. Malformed
//! fields never fail extraction; they just don't contribute.

use tracing::debug;

use crate::statement::{LogRecord, Statement};

/// Marker preceding statement text in ORM debug output.
pub const SQL_MARKER: &str = "[sql]:";

const FIELD_TYPE: &str = "type";
const QUERY_TYPE: &str = "query";
const FIELD_DURATION: &str = "duration";
const FIELD_DURATION_MS: &str = "duration_ms";
const FIELD_TABLE: &str = "db.table";
const FIELD_OPERATION: &str = "db.operation";
const FIELD_ROWS: &str = "db.rows";
const FIELD_VARS: &str = "db.vars";
const FIELD_GQL_OPERATION: &str = "gql.operation";
const FIELD_GQL_OPERATION_NAME: &str = "gql.operationName";
const FIELD_REQUEST_ID: &str = "request_id";
const FIELD_SPAN_ID: &str = "span_id";
const FIELD_TRACE_ID: &str = "trace_id";

const KNOWN_FIELDS: &[&str] = &[
    FIELD_DURATION,
    FIELD_DURATION_MS,
    FIELD_TABLE,
    FIELD_OPERATION,
    FIELD_ROWS,
    FIELD_VARS,
    FIELD_GQL_OPERATION,
    FIELD_GQL_OPERATION_NAME,
    FIELD_REQUEST_ID,
    FIELD_SPAN_ID,
    FIELD_TRACE_ID,
];

/// Extracts every statement found in `records`, in record order.
pub fn extract<'a, I>(records: I) -> Vec<Statement>
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    records.into_iter().filter_map(extract_one).collect()
}

/// Extracts the statement carried by a single record, if any.
pub fn extract_one(record: &LogRecord) -> Option<Statement> {
    let text = statement_text(record)?;
    let mut statement = Statement::new(text);

    // `duration` wins over `duration_ms` when both parse.
    if let Some(ms) = numeric_field(record, FIELD_DURATION_MS, parse_duration_ms) {
        statement.duration_ms = ms;
    }
    if let Some(ms) = numeric_field(record, FIELD_DURATION, parse_duration_ms) {
        statement.duration_ms = ms;
    }
    if let Some(rows) = numeric_field(record, FIELD_ROWS, |v| v.trim().parse::<i64>().ok()) {
        statement.rows = rows;
    }

    if let Some(table) = record.field(FIELD_TABLE) {
        statement.table = table.to_string();
    }
    if let Some(operation) = record.field(FIELD_OPERATION) {
        statement.operation = operation.to_string();
    }
    if let Some(vars) = record.field(FIELD_VARS) {
        statement.variables_raw = vars.to_string();
    }

    statement.graphql_operation = record
        .field(FIELD_GQL_OPERATION)
        .or_else(|| record.field(FIELD_GQL_OPERATION_NAME))
        .map(str::to_string);

    statement.correlation.request_id = record.field(FIELD_REQUEST_ID).map(str::to_string);
    statement.correlation.span_id = record.field(FIELD_SPAN_ID).map(str::to_string);
    statement.correlation.trace_id = record.field(FIELD_TRACE_ID).map(str::to_string);

    statement.extra_fields = record
        .fields
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Some(statement)
}

fn statement_text(record: &LogRecord) -> Option<&str> {
    let text = if let Some(pos) = record.message.find(SQL_MARKER) {
        record.message[pos + SQL_MARKER.len()..]
            .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
    } else if record.field(FIELD_TYPE) == Some(QUERY_TYPE) {
        record.message.as_str()
    } else {
        return None;
    };

    if text.trim().is_empty() { None } else { Some(text) }
}

fn numeric_field<T>(
    record: &LogRecord,
    key: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let raw = record.field(key)?;
    let parsed = parse(raw);
    if parsed.is_none() {
        debug!(field = key, value = raw, "Ignoring unparseable numeric log field");
    }
    parsed
}

/// Parses a millisecond duration, tolerating a trailing `ms` unit.
///
/// Negative and non-finite values are treated as malformed: a statement cannot
/// take less than no time.
fn parse_duration_ms(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix("ms").unwrap_or(trimmed).trim_end();
    number
        .parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
}
