//! PostgreSQL EXPLAIN backend for QueryLens.
//!
//! Implements [`querylens_core::PlanSource`] over an sqlx connection pool, so
//! statement sets extracted by `querylens-core` can be explained against a
//! live database.
//!
//! # Architecture
//!
//! - [`config`]: connection and EXPLAIN settings
//! - [`error`]: backend errors and sqlx error classification
//! - [`pool`]: connection pool management
//! - [`explainer`]: the `PlanSource` implementation

pub mod config;
pub mod error;
pub mod explainer;
pub mod pool;

// Re-export main types
pub use config::{ExplainMode, PostgresConfig};
pub use error::{PostgresError, Result, classify_explain_error};
pub use explainer::PostgresExplainer;
pub use pool::{create_pool, mask_password};
