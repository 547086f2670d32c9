//! Comparison of two traced executions.
//!
//! Statements are grouped by normalized shape on each side; shapes present on
//! both sides get a performance delta, the rest are reported as exclusive to
//! one side. The comparison is a pure function of its inputs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::plan::{PlanNode, plans_differ};
use crate::statement::Statement;

/// Aggregate figures for both statement sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total_queries1: usize,
    pub total_queries2: usize,
    pub avg_duration1: f64,
    pub avg_duration2: f64,
    pub unique_queries1: usize,
    pub unique_queries2: usize,
    pub common_queries: usize,
    pub queries_with_plan_change: usize,
}

/// Performance delta for one shape present in both sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDifference {
    pub normalized_query: String,
    pub query_hash: String,
    pub avg_duration1: f64,
    pub avg_duration2: f64,
    /// `avg_duration2 - avg_duration1`
    pub duration_diff_ms: f64,
    /// Relative change against set 1; 0 when set 1 averaged 0 ms
    pub duration_diff_pct: f64,
    pub count1: usize,
    pub count2: usize,
    pub plan_changed: bool,
}

/// Result of [`compare`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub summary: ComparisonSummary,
    /// Largest relative changes first
    pub performance_differences: Vec<PerformanceDifference>,
    /// One representative per shape missing from set 2
    pub only_in_set1: Vec<Statement>,
    /// One representative per shape missing from set 1
    pub only_in_set2: Vec<Statement>,
}

type Groups<'a> = IndexMap<&'a str, Vec<&'a Statement>>;

/// Compares two statement sets, detecting plan changes structurally.
pub fn compare(set1: &[Statement], set2: &[Statement]) -> ComparisonResult {
    compare_with(set1, set2, plans_differ)
}

/// Compares two statement sets with a custom plan-change predicate.
pub fn compare_with<F>(set1: &[Statement], set2: &[Statement], plan_changed: F) -> ComparisonResult
where
    F: Fn(Option<&PlanNode>, Option<&PlanNode>) -> bool,
{
    let groups1 = group_by_shape(set1);
    let groups2 = group_by_shape(set2);

    let mut performance_differences = Vec::new();
    for (shape, statements1) in &groups1 {
        let Some(statements2) = groups2.get(shape) else {
            continue;
        };

        let avg1 = average_duration(statements1.iter().copied());
        let avg2 = average_duration(statements2.iter().copied());
        let diff = avg2 - avg1;
        let pct = if avg1 == 0.0 { 0.0 } else { diff / avg1 * 100.0 };

        performance_differences.push(PerformanceDifference {
            normalized_query: shape.to_string(),
            query_hash: statements1[0].query_hash.clone(),
            avg_duration1: avg1,
            avg_duration2: avg2,
            duration_diff_ms: diff,
            duration_diff_pct: pct,
            count1: statements1.len(),
            count2: statements2.len(),
            plan_changed: plan_changed(
                representative_plan(statements1),
                representative_plan(statements2),
            ),
        });
    }

    let queries_with_plan_change = performance_differences
        .iter()
        .filter(|d| d.plan_changed)
        .count();
    let common_queries = performance_differences.len();

    performance_differences.sort_by(|a, b| {
        b.duration_diff_pct
            .abs()
            .total_cmp(&a.duration_diff_pct.abs())
            .then_with(|| b.duration_diff_ms.abs().total_cmp(&a.duration_diff_ms.abs()))
    });

    ComparisonResult {
        summary: ComparisonSummary {
            total_queries1: set1.len(),
            total_queries2: set2.len(),
            avg_duration1: average_duration(set1),
            avg_duration2: average_duration(set2),
            unique_queries1: groups1.len(),
            unique_queries2: groups2.len(),
            common_queries,
            queries_with_plan_change,
        },
        performance_differences,
        only_in_set1: exclusive_representatives(&groups1, &groups2),
        only_in_set2: exclusive_representatives(&groups2, &groups1),
    }
}

fn group_by_shape(statements: &[Statement]) -> Groups<'_> {
    let mut groups: Groups<'_> = IndexMap::new();
    for statement in statements {
        groups
            .entry(statement.normalized_query.as_str())
            .or_default()
            .push(statement);
    }
    groups
}

fn average_duration<'a>(statements: impl IntoIterator<Item = &'a Statement>) -> f64 {
    let (sum, count) = statements
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), s| (sum + s.duration_ms, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn representative_plan<'a>(statements: &[&'a Statement]) -> Option<&'a PlanNode> {
    statements.iter().find_map(|s| s.explain_plan.as_ref())
}

fn exclusive_representatives(own: &Groups<'_>, other: &Groups<'_>) -> Vec<Statement> {
    own.iter()
        .filter(|(shape, _)| !other.contains_key(*shape))
        .map(|(_, statements)| statements[0].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(sql: &str, ms: f64) -> Statement {
        Statement::new(sql).with_duration_ms(ms)
    }

    #[test]
    fn test_compare_empty_sets() {
        let result = compare(&[], &[]);
        assert_eq!(result, ComparisonResult::default());
        assert_eq!(result.summary.avg_duration1, 0.0);
        assert!(result.performance_differences.is_empty());
    }

    #[test]
    fn test_compare_with_itself() {
        let set = vec![
            stmt("SELECT * FROM users WHERE id = $1", 5.0),
            stmt("SELECT * FROM users WHERE id = $2", 7.0),
            stmt("SELECT * FROM orders", 3.0),
        ];
        let result = compare(&set, &set);

        assert_eq!(result.summary.common_queries, 2);
        assert_eq!(result.summary.unique_queries1, 2);
        assert_eq!(result.summary.total_queries1, 3);
        assert_eq!(result.summary.avg_duration1, 5.0);
        assert!(result.only_in_set1.is_empty());
        assert!(result.only_in_set2.is_empty());
        assert!(result.performance_differences.iter().all(|d| d.duration_diff_pct == 0.0));
    }

    #[test]
    fn test_twice_as_fast_is_minus_fifty_percent() {
        let set1 = vec![stmt("SELECT * FROM t WHERE id = $1", 20.0)];
        let set2 = vec![stmt("SELECT * FROM t WHERE id = $1", 10.0)];
        let result = compare(&set1, &set2);

        assert_eq!(result.performance_differences.len(), 1);
        let diff = &result.performance_differences[0];
        assert!((diff.duration_diff_pct - -50.0).abs() < 1e-9);
        assert_eq!(diff.duration_diff_ms, -10.0);
        assert_eq!(diff.count1, 1);
        assert_eq!(diff.count2, 1);
    }

    #[test]
    fn test_zero_baseline_has_zero_percent() {
        let set1 = vec![stmt("SELECT 1", 0.0)];
        let set2 = vec![stmt("SELECT 1", 12.0)];
        let diff = &compare(&set1, &set2).performance_differences[0];
        assert_eq!(diff.duration_diff_pct, 0.0);
        assert_eq!(diff.duration_diff_ms, 12.0);
    }

    #[test]
    fn test_ordering_by_relative_then_absolute_change() {
        let set1 = vec![
            stmt("SELECT * FROM a", 10.0),
            stmt("SELECT * FROM b", 100.0),
            stmt("SELECT * FROM c", 10.0),
        ];
        let set2 = vec![
            stmt("SELECT * FROM a", 15.0),  // +50%, +5 ms
            stmt("SELECT * FROM b", 150.0), // +50%, +50 ms
            stmt("SELECT * FROM c", 1.0),   // -90%
        ];
        let result = compare(&set1, &set2);
        let order: Vec<&str> = result
            .performance_differences
            .iter()
            .map(|d| d.normalized_query.as_str())
            .collect();
        assert_eq!(order, vec!["SELECT * FROM c", "SELECT * FROM b", "SELECT * FROM a"]);
    }

    #[test]
    fn test_exclusive_shapes_in_encounter_order() {
        let set1 = vec![
            stmt("SELECT * FROM z", 1.0),
            stmt("SELECT * FROM common", 1.0),
            stmt("SELECT * FROM y WHERE id = 1", 1.0),
            stmt("SELECT * FROM y WHERE id = 2", 1.0),
        ];
        let set2 = vec![stmt("SELECT * FROM common", 2.0), stmt("DELETE FROM x", 1.0)];
        let result = compare(&set1, &set2);

        let only1: Vec<&str> = result.only_in_set1.iter().map(|s| s.raw_query.as_str()).collect();
        assert_eq!(only1, vec!["SELECT * FROM z", "SELECT * FROM y WHERE id = 1"]);
        assert_eq!(result.only_in_set2.len(), 1);
        assert_eq!(result.only_in_set2[0].raw_query, "DELETE FROM x");
        assert_eq!(result.summary.common_queries, 1);
        assert_eq!(result.summary.unique_queries1, 3);
    }

    #[test]
    fn test_averages_per_shape() {
        let set1 = vec![stmt("SELECT 1", 10.0), stmt("SELECT 2", 20.0)];
        let set2 = vec![stmt("SELECT 3", 45.0)];
        let result = compare(&set1, &set2);
        let diff = &result.performance_differences[0];
        assert_eq!(diff.avg_duration1, 15.0);
        assert_eq!(diff.avg_duration2, 45.0);
        assert_eq!(diff.count1, 2);
        assert!((diff.duration_diff_pct - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_change_detection() {
        let seq = PlanNode::new("Seq Scan").with_relation("users");
        let idx = PlanNode::new("Index Scan")
            .with_relation("users")
            .with_index("users_email_idx");

        let set1 = vec![
            stmt("SELECT * FROM users WHERE email = $1", 30.0).with_plan(seq.clone()),
            stmt("SELECT * FROM orders", 1.0).with_plan(PlanNode::new("Seq Scan").with_relation("orders")),
        ];
        let set2 = vec![
            stmt("SELECT * FROM users WHERE email = $1", 2.0).with_plan(idx),
            stmt("SELECT * FROM orders", 1.0),
        ];
        let result = compare(&set1, &set2);
        assert_eq!(result.summary.queries_with_plan_change, 1);
        assert!(result.performance_differences[0].plan_changed);
        assert!(!result.performance_differences[1].plan_changed);

        let never = compare_with(&set1, &set2, |_, _| false);
        assert_eq!(never.summary.queries_with_plan_change, 0);
    }
}
