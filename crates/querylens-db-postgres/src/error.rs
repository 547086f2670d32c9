//! Error types for the PostgreSQL EXPLAIN backend.

use querylens_core::{ExplainError, ExplainErrorKind};
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for a statement cancelled by `statement_timeout` (57014).
pub const PG_QUERY_CANCELED: &str = "57014";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Errors specific to setting up the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

/// Maps a sqlx error raised while explaining a statement to an [`ExplainError`].
///
/// Errors reported by the server are the statement's fault (`Syntax`), except
/// cancellation by `statement_timeout` which is a `Timeout`. Transport and
/// pool errors are `Connection`; decode errors are `Format`.
pub fn classify_explain_error(err: SqlxError) -> ExplainError {
    match &err {
        SqlxError::Database(db_err) => {
            if has_pg_error_code(&err, PG_QUERY_CANCELED) {
                return ExplainError::new(ExplainErrorKind::Timeout, db_err.message());
            }
            match db_err.code() {
                Some(code) => {
                    ExplainError::syntax(format!("{} (SQLSTATE {code})", db_err.message()))
                }
                None => ExplainError::syntax(db_err.message()),
            }
        }
        SqlxError::RowNotFound
        | SqlxError::ColumnDecode { .. }
        | SqlxError::Decode(_)
        | SqlxError::TypeNotFound { .. }
        | SqlxError::ColumnNotFound(_)
        | SqlxError::ColumnIndexOutOfBounds { .. } => ExplainError::format(err.to_string()),
        _ => ExplainError::connection(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_classify_transport_errors() {
        assert_eq!(
            classify_explain_error(SqlxError::PoolTimedOut).kind,
            ExplainErrorKind::Connection
        );
        assert_eq!(
            classify_explain_error(SqlxError::PoolClosed).kind,
            ExplainErrorKind::Connection
        );
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = classify_explain_error(SqlxError::Io(io));
        assert_eq!(err.kind, ExplainErrorKind::Connection);
        assert!(err.message.contains("refused"));
    }

    #[test]
    fn test_classify_format_errors() {
        assert_eq!(
            classify_explain_error(SqlxError::RowNotFound).kind,
            ExplainErrorKind::Format
        );
        assert_eq!(
            classify_explain_error(SqlxError::ColumnNotFound("QUERY PLAN".into())).kind,
            ExplainErrorKind::Format
        );
    }

    #[test]
    fn test_non_database_errors_have_no_pg_code() {
        assert!(!has_pg_error_code(&SqlxError::PoolTimedOut, PG_QUERY_CANCELED));
    }
}
