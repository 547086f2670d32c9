//! Error types for plan acquisition.
//!
//! Evidence problems (malformed log records, unparseable variables) are never
//! errors in this crate; they degrade to zero values. Only talking to a
//! relational engine can fail, and those failures are reported as
//! [`ExplainError`] so callers can branch on [`ExplainErrorKind`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Category of an EXPLAIN failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainErrorKind {
    /// The engine could not be reached or the connection broke.
    Connection,
    /// The engine rejected the statement.
    Syntax,
    /// The engine answered with something that is not a recognizable plan.
    Format,
    /// The call did not finish within its deadline.
    Timeout,
}

impl fmt::Display for ExplainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Syntax => "syntax",
            Self::Format => "format",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// A failed attempt to obtain an execution plan for one statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("EXPLAIN failed ({kind}): {message}")]
pub struct ExplainError {
    /// What went wrong.
    pub kind: ExplainErrorKind,
    /// Engine error text or parse detail.
    pub message: String,
}

impl ExplainError {
    /// Creates a new error of the given kind.
    pub fn new(kind: ExplainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ExplainErrorKind::Connection, message)
    }

    /// Creates a syntax (engine rejected the statement) error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ExplainErrorKind::Syntax, message)
    }

    /// Creates a format (unexpected EXPLAIN output) error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ExplainErrorKind::Format, message)
    }

    /// Creates a timeout error for a call that exceeded `after`.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ExplainErrorKind::Timeout,
            format!("timed out after {} ms", after.as_millis()),
        )
    }
}

impl From<serde_json::Error> for ExplainError {
    fn from(err: serde_json::Error) -> Self {
        Self::format(err.to_string())
    }
}
