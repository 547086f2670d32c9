//! PostgreSQL implementation of the EXPLAIN capability.
//!
//! Every statement is explained inside its own transaction that is always
//! rolled back, so `EXPLAIN ANALYZE` of an INSERT/UPDATE/DELETE leaves no
//! trace. `SET LOCAL statement_timeout` bounds the server-side work.
//!
//! ## Example
//!
//! ```ignore
//! use querylens_core::{BatchOptions, explain_batch};
//! use querylens_db_postgres::{PostgresConfig, PostgresExplainer};
//!
//! let explainer = PostgresExplainer::connect(&PostgresConfig::new(url)).await?;
//! let report = explain_batch(&explainer, &mut statements, &BatchOptions::default()).await;
//! ```

use async_trait::async_trait;
use querylens_core::plan::parse_explain;
use querylens_core::{ExplainError, PlanNode, PlanSource};
use serde_json::Value;
use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument, warn};

use crate::config::{ExplainMode, PostgresConfig};
use crate::error::{Result, classify_explain_error};
use crate::pool::create_pool;

/// Runs EXPLAIN against a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresExplainer {
    pool: PgPool,
    mode: ExplainMode,
    statement_timeout_ms: u64,
}

impl PostgresExplainer {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool, config: &PostgresConfig) -> Self {
        Self {
            pool,
            mode: config.explain_mode,
            statement_timeout_ms: config.statement_timeout_ms,
        }
    }

    /// Creates a pool from `config` and wraps it.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::new(pool, config))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The EXPLAIN mode in use.
    pub fn mode(&self) -> ExplainMode {
        self.mode
    }

    /// Builds the EXPLAIN statement for a literal query.
    pub fn explain_sql(&self, sql: &str) -> String {
        let body = sql.trim().trim_end_matches(';').trim_end();
        format!("{} {}", self.mode.prefix(), body)
    }

    async fn fetch_plan_document(&self, sql: &str) -> std::result::Result<Value, SqlxError> {
        let mut tx = self.pool.begin().await?;

        if self.statement_timeout_ms > 0 {
            // SET does not take bind parameters.
            query(&format!(
                "SET LOCAL statement_timeout = {}",
                self.statement_timeout_ms
            ))
            .execute(&mut *tx)
            .await?;
        }

        let row: (Value,) = query_as(&self.explain_sql(sql)).fetch_one(&mut *tx).await?;

        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Failed to roll back EXPLAIN transaction");
        }

        Ok(row.0)
    }
}

#[async_trait]
impl PlanSource for PostgresExplainer {
    #[instrument(skip_all, fields(mode = ?self.mode))]
    async fn explain(&self, sql: &str) -> std::result::Result<PlanNode, ExplainError> {
        let document = self
            .fetch_plan_document(sql)
            .await
            .map_err(classify_explain_error)?;
        let plan = parse_explain(&document)?;
        debug!(node_type = %plan.node_type, nodes = plan.node_count(), "EXPLAIN succeeded");
        Ok(plan)
    }
}
