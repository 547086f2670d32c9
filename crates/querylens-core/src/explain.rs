//! EXPLAIN capability and partial-failure-tolerant batches.
//!
//! [`PlanSource`] is the seam to a relational engine: give it literal SQL and
//! it returns the root [`PlanNode`] or a typed [`ExplainError`].
//! [`explain_batch`] fans a statement set out to a source with bounded
//! concurrency and a per-call deadline. One failing or hanging statement is
//! logged and recorded, never allowed to stop the rest.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::ExplainError;
use crate::plan::PlanNode;
use crate::statement::Statement;
use crate::variables::{substitute, variables_map};

/// Default duration at or above which a statement is explained.
pub const DEFAULT_MIN_DURATION_MS: f64 = 100.0;

/// Default per-call deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default number of EXPLAIN calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A relational engine able to explain literal SQL.
///
/// Implementations must be thread-safe; concurrent calls share whatever pool
/// the implementation holds.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Explains `query` and returns the root plan node.
    async fn explain(&self, query: &str) -> Result<PlanNode, ExplainError>;
}

#[async_trait]
impl<T: PlanSource + ?Sized> PlanSource for std::sync::Arc<T> {
    async fn explain(&self, query: &str) -> Result<PlanNode, ExplainError> {
        (**self).explain(query).await
    }
}

/// Caller policy for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Only statements at least this slow are explained
    pub min_duration_ms: f64,
    /// Deadline for each individual call
    pub timeout_ms: u64,
    /// Maximum calls in flight
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            min_duration_ms: DEFAULT_MIN_DURATION_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl BatchOptions {
    /// Sets the duration threshold.
    #[must_use]
    pub fn with_min_duration_ms(mut self, ms: f64) -> Self {
        self.min_duration_ms = ms;
        self
    }

    /// Sets the per-call deadline.
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

/// One statement whose plan could not be obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainFailure {
    /// Position of the statement in the batch input
    pub index: usize,
    pub query_hash: String,
    pub error: ExplainError,
}

/// Outcome of [`explain_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Statements handed to the source
    pub attempted: usize,
    /// Statements that received a plan
    pub explained: usize,
    /// Statements below the threshold or already explained
    pub skipped: usize,
    /// Failures in input order
    pub failures: Vec<ExplainFailure>,
}

/// Builds the literal SQL that is sent to EXPLAIN for a statement.
pub fn literal_query(statement: &Statement) -> String {
    substitute(&statement.raw_query, &variables_map(&statement.variables_raw))
}

/// Explains every eligible statement and attaches the resulting plans.
///
/// A statement is eligible when it has no plan yet and its duration is at
/// least `options.min_duration_ms`. Failures and timeouts are logged and
/// collected in the report; they never abort the batch.
#[instrument(skip_all, fields(statements = statements.len()))]
pub async fn explain_batch<S>(
    source: &S,
    statements: &mut [Statement],
    options: &BatchOptions,
) -> BatchReport
where
    S: PlanSource + ?Sized,
{
    let jobs: Vec<(usize, String)> = statements
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.has_plan() && s.duration_ms >= options.min_duration_ms)
        .map(|(index, s)| (index, literal_query(s)))
        .collect();

    let mut report = BatchReport {
        attempted: jobs.len(),
        skipped: statements.len() - jobs.len(),
        ..Default::default()
    };

    let deadline = options.timeout();
    let mut outcomes: Vec<(usize, Result<PlanNode, ExplainError>)> = stream::iter(jobs)
        .map(|(index, query)| async move {
            let outcome = match tokio::time::timeout(deadline, source.explain(&query)).await {
                Ok(result) => result,
                Err(_) => Err(ExplainError::timeout(deadline)),
            };
            (index, outcome)
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);

    for (index, outcome) in outcomes {
        let statement = &mut statements[index];
        match outcome {
            Ok(plan) => {
                statement.attach_plan(plan);
                report.explained += 1;
            }
            Err(error) => {
                warn!(
                    query_hash = %statement.query_hash,
                    kind = %error.kind,
                    error = %error.message,
                    "EXPLAIN failed, skipping statement"
                );
                report.failures.push(ExplainFailure {
                    index,
                    query_hash: statement.query_hash.clone(),
                    error,
                });
            }
        }
    }

    info!(
        attempted = report.attempted,
        explained = report.explained,
        failed = report.failures.len(),
        skipped = report.skipped,
        "EXPLAIN batch finished"
    );

    report
}
