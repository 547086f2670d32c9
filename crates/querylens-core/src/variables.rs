//! Parameter evidence and placeholder substitution.
//!
//! Captured bind parameters arrive in whatever shape the logging ORM chose:
//! a JSON array for positional parameters, a JSON object keyed by position, or
//! a map the caller already built. [`VariableEvidence`] resolves that once, and
//! [`substitute`] turns a `$n`-parameterized statement into literal SQL that
//! can be handed to EXPLAIN.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([0-9]+)").expect("Invalid placeholder regex"));

static DECIMAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("Invalid decimal regex"));

/// Parameter values captured alongside a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableEvidence {
    /// `[v1, v2, ...]`, bound to `$1`, `$2`, ...
    Positional(Vec<Value>),
    /// `{"1": v1, ...}` keyed by placeholder number.
    Named(Map<String, Value>),
    /// Already stringified values keyed by placeholder number.
    Resolved(HashMap<String, String>),
}

impl VariableEvidence {
    /// Parses raw evidence text. Empty, invalid or scalar JSON yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(raw).ok()? {
            Value::Array(values) => Some(Self::Positional(values)),
            Value::Object(map) => Some(Self::Named(map)),
            _ => None,
        }
    }

    /// Converts the evidence into a placeholder-number → value map.
    pub fn to_map(&self) -> HashMap<String, String> {
        match self {
            Self::Positional(values) => values
                .iter()
                .enumerate()
                .map(|(i, value)| ((i + 1).to_string(), stringify(value)))
                .collect(),
            Self::Named(map) => map
                .iter()
                .map(|(key, value)| {
                    (key.trim_start_matches('$').to_string(), stringify(value))
                })
                .collect(),
            Self::Resolved(map) => map.clone(),
        }
    }
}

impl From<HashMap<String, String>> for VariableEvidence {
    fn from(map: HashMap<String, String>) -> Self {
        Self::Resolved(map)
    }
}

/// Parses raw evidence and converts it to a map; unrecognized evidence yields an empty map.
pub fn variables_map(raw: &str) -> HashMap<String, String> {
    VariableEvidence::parse(raw)
        .map(|evidence| evidence.to_map())
        .unwrap_or_default()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replaces `$n` placeholders that have a value in `vars` with SQL literals.
///
/// Placeholders without a value are left in place so partially captured
/// parameters still produce as much runnable SQL as possible.
pub fn substitute(query: &str, vars: &HashMap<String, String>) -> String {
    if vars.is_empty() {
        return query.to_string();
    }
    PLACEHOLDER_REGEX
        .replace_all(query, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => sql_literal(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Renders one parameter value as a SQL literal.
pub fn sql_literal(value: &str) -> String {
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        "NULL".to_string()
    } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        value.to_string()
    } else if DECIMAL_REGEX.is_match(value) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_number_and_string() {
        assert_eq!(
            substitute(
                "SELECT * FROM t WHERE a=$1 AND b=$2",
                &vars(&[("1", "5"), ("2", "hi")])
            ),
            "SELECT * FROM t WHERE a=5 AND b='hi'"
        );
    }

    #[test]
    fn test_substitute_null_values() {
        let query = "SELECT * FROM t WHERE a=$1";
        assert_eq!(
            substitute(query, &vars(&[("1", "")])),
            "SELECT * FROM t WHERE a=NULL"
        );
        assert_eq!(
            substitute(query, &vars(&[("1", "null")])),
            "SELECT * FROM t WHERE a=NULL"
        );
    }

    #[test]
    fn test_substitute_escapes_quotes() {
        assert_eq!(
            substitute("SELECT * FROM t WHERE a=$1", &vars(&[("1", "o'brien")])),
            "SELECT * FROM t WHERE a='o''brien'"
        );
    }

    #[test]
    fn test_literal_precedence() {
        assert_eq!(sql_literal("TRUE"), "TRUE");
        assert_eq!(sql_literal("false"), "false");
        assert_eq!(sql_literal("-12.50"), "-12.50");
        assert_eq!(sql_literal("42"), "42");
        assert_eq!(sql_literal("1.2.3"), "'1.2.3'");
        assert_eq!(sql_literal("+5"), "'+5'");
        assert_eq!(sql_literal("2024-01-01"), "'2024-01-01'");
        assert_eq!(sql_literal("Null"), "NULL");
    }

    #[test]
    fn test_missing_placeholders_are_untouched() {
        assert_eq!(
            substitute("UPDATE t SET a=$1 WHERE id=$2", &vars(&[("2", "7")])),
            "UPDATE t SET a=$1 WHERE id=7"
        );
        assert_eq!(
            substitute("SELECT $1", &HashMap::new()),
            "SELECT $1"
        );
    }

    #[test]
    fn test_multi_digit_placeholders() {
        let mut values = HashMap::new();
        for i in 1..=12 {
            values.insert(i.to_string(), format!("{}", i * 10));
        }
        assert_eq!(
            substitute("VALUES ($1, $12, $10)", &values),
            "VALUES (10, 120, 100)"
        );
    }

    #[test]
    fn test_positional_evidence() {
        let map = variables_map(r#"[5, "hi", null, true, 1.5, {"k": 1}]"#);
        assert_eq!(map["1"], "5");
        assert_eq!(map["2"], "hi");
        assert_eq!(map["3"], "");
        assert_eq!(map["4"], "true");
        assert_eq!(map["5"], "1.5");
        assert_eq!(map["6"], r#"{"k":1}"#);
    }

    #[test]
    fn test_named_evidence() {
        let map = variables_map(r#"{"1": "a", "$2": 3}"#);
        assert_eq!(map.len(), 2);
        assert_eq!(map["1"], "a");
        assert_eq!(map["2"], "3");
    }

    #[test]
    fn test_resolved_evidence_passes_through() {
        let resolved = vars(&[("1", "x")]);
        let evidence = VariableEvidence::from(resolved.clone());
        assert_eq!(evidence.to_map(), resolved);
    }

    #[test]
    fn test_unrecognized_evidence_is_empty() {
        assert!(variables_map("").is_empty());
        assert!(variables_map("not json").is_empty());
        assert!(variables_map("42").is_empty());
        assert!(variables_map("\"str\"").is_empty());
        assert!(VariableEvidence::parse("   ").is_none());
    }

    #[test]
    fn test_end_to_end_from_raw_evidence() {
        let query = "SELECT * FROM users WHERE email = $1 AND active = $2 LIMIT $3";
        let map = variables_map(r#"["o'hara@example.com", true, 10]"#);
        assert_eq!(
            substitute(query, &map),
            "SELECT * FROM users WHERE email = 'o''hara@example.com' AND active = true LIMIT 10"
        );
    }
}
