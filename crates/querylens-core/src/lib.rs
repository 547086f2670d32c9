//! SQL query analysis engine for QueryLens.
//!
//! This crate turns SQL evidence captured from application logs into
//! performance insight. Everything except [`explain`] is synchronous and pure:
//! functions read their inputs and return fresh values, so they can be called
//! from any number of threads without coordination.
//!
//! # Example
//!
//! ```
//! use querylens_core::prelude::*;
//!
//! let before = vec![
//!     LogRecord::new("[sql]: SELECT * FROM users WHERE id = $1").with_field("duration", "20"),
//! ];
//! let after = vec![
//!     LogRecord::new("SELECT * FROM users WHERE id = $2")
//!         .with_field("type", "query")
//!         .with_field("duration_ms", "10"),
//! ];
//!
//! let result = compare(&extract(&before), &extract(&after));
//! assert_eq!(result.summary.common_queries, 1);
//! assert_eq!(result.performance_differences[0].duration_diff_pct, -50.0);
//! ```
//!
//! # Architecture
//!
//! - [`normalize`]: query shape normalization and identity hashing
//! - [`statement`]: log records, statements and persistence records
//! - [`extract`]: statement extraction from log records
//! - [`variables`]: parameter evidence and placeholder substitution
//! - [`plan`]: execution plan model and EXPLAIN JSON parsing
//! - [`explain`]: the EXPLAIN capability trait and batch fan-out
//! - [`advisor`]: plan walking and index recommendations
//! - [`compare`]: comparison of two statement sets
//! - [`stats`]: per-shape duration statistics

pub mod advisor;
pub mod compare;
pub mod error;
pub mod explain;
pub mod extract;
pub mod normalize;
pub mod plan;
pub mod statement;
pub mod stats;
pub mod variables;

// Re-export main types
pub use advisor::{
    AdvisorConfig, IndexAdvisor, IndexAnalysis, IndexRecommendation, IndexUsage, Priority,
    SequentialScanIssue, analyze_index_usage,
};
pub use compare::{ComparisonResult, ComparisonSummary, PerformanceDifference, compare};
pub use error::{ExplainError, ExplainErrorKind};
pub use explain::{BatchOptions, BatchReport, ExplainFailure, PlanSource, explain_batch};
pub use extract::extract;
pub use normalize::{normalize, query_hash};
pub use plan::{PlanNode, parse_explain};
pub use statement::{Correlation, LogRecord, PlanRecord, Statement};
pub use stats::{QueryStats, summarize};
pub use variables::{VariableEvidence, substitute};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use querylens_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::advisor::{AdvisorConfig, IndexAdvisor, IndexAnalysis, analyze_index_usage};
    pub use crate::compare::{ComparisonResult, compare};
    pub use crate::error::{ExplainError, ExplainErrorKind};
    pub use crate::explain::{BatchOptions, BatchReport, PlanSource, explain_batch};
    pub use crate::extract::extract;
    pub use crate::normalize::{normalize, query_hash};
    pub use crate::plan::PlanNode;
    pub use crate::statement::{LogRecord, Statement};
    pub use crate::stats::summarize;
    pub use crate::variables::{VariableEvidence, substitute};
}
