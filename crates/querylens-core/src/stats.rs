//! Per-shape duration statistics for one execution.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::statement::Statement;

/// Default occurrence count at which a shape is flagged as repeated (N+1 suspect).
pub const DEFAULT_REPEAT_THRESHOLD: usize = 5;

/// Duration statistics for one normalized shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    pub query_hash: String,
    pub normalized_query: String,
    pub count: usize,
    pub total_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    /// Non-empty tables reported for the shape, sorted
    pub tables: Vec<String>,
    /// True when the shape ran at least `repeat_threshold` times
    pub repeated: bool,
}

/// Aggregates `statements` by normalized shape.
///
/// Ordered by total duration (descending), then by first encounter.
pub fn summarize(statements: &[Statement], repeat_threshold: usize) -> Vec<QueryStats> {
    let mut groups: IndexMap<&str, (QueryStats, BTreeSet<&str>)> = IndexMap::new();

    for statement in statements {
        let (stats, tables) = groups
            .entry(statement.normalized_query.as_str())
            .or_insert_with(|| {
                (
                    QueryStats {
                        query_hash: statement.query_hash.clone(),
                        normalized_query: statement.normalized_query.clone(),
                        count: 0,
                        total_duration_ms: 0.0,
                        avg_duration_ms: 0.0,
                        min_duration_ms: f64::INFINITY,
                        max_duration_ms: 0.0,
                        tables: Vec::new(),
                        repeated: false,
                    },
                    BTreeSet::new(),
                )
            });
        stats.count += 1;
        stats.total_duration_ms += statement.duration_ms;
        stats.min_duration_ms = stats.min_duration_ms.min(statement.duration_ms);
        stats.max_duration_ms = stats.max_duration_ms.max(statement.duration_ms);
        if !statement.table.is_empty() {
            tables.insert(statement.table.as_str());
        }
    }

    let mut summary: Vec<QueryStats> = groups
        .into_values()
        .map(|(mut stats, tables)| {
            stats.avg_duration_ms = stats.total_duration_ms / stats.count as f64;
            stats.tables = tables.into_iter().map(str::to_string).collect();
            stats.repeated = stats.count >= repeat_threshold;
            stats
        })
        .collect();
    summary.sort_by(|a, b| b.total_duration_ms.total_cmp(&a.total_duration_ms));
    summary
}

/// Shapes flagged as repeated, most frequent first.
pub fn repeated_queries(stats: &[QueryStats]) -> Vec<&QueryStats> {
    let mut repeated: Vec<&QueryStats> = stats.iter().filter(|s| s.repeated).collect();
    repeated.sort_by(|a, b| b.count.cmp(&a.count));
    repeated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(sql: &str, ms: f64, table: &str) -> Statement {
        Statement::new(sql).with_duration_ms(ms).with_table(table)
    }

    #[test]
    fn test_summarize_groups_by_shape() {
        let statements = vec![
            stmt("SELECT * FROM users WHERE id = $1", 2.0, "users"),
            stmt("SELECT * FROM orders", 50.0, "orders"),
            stmt("SELECT * FROM users WHERE id = $1", 4.0, "users"),
            stmt("SELECT * FROM users WHERE id = $1", 6.0, ""),
        ];
        let summary = summarize(&statements, 3);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].normalized_query, "SELECT * FROM orders");
        assert!(!summary[0].repeated);

        let users = &summary[1];
        assert_eq!(users.count, 3);
        assert_eq!(users.total_duration_ms, 12.0);
        assert_eq!(users.avg_duration_ms, 4.0);
        assert_eq!(users.min_duration_ms, 2.0);
        assert_eq!(users.max_duration_ms, 6.0);
        assert_eq!(users.tables, vec!["users"]);
        assert!(users.repeated);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[], DEFAULT_REPEAT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_repeated_queries() {
        let mut statements = Vec::new();
        for i in 0..6 {
            statements.push(stmt(&format!("SELECT * FROM items WHERE id = {i}"), 1.0, "items"));
        }
        statements.push(stmt("SELECT * FROM carts", 1.0, "carts"));

        let summary = summarize(&statements, DEFAULT_REPEAT_THRESHOLD);
        let repeated = repeated_queries(&summary);
        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].normalized_query, "SELECT * FROM items WHERE id = N");
        assert_eq!(repeated[0].count, 6);
    }
}
