//! Plan walking and index recommendations.
//!
//! Walks every available execution plan in a statement set, aggregates
//! sequential scans per table, counts index-backed scans, and turns each
//! scanned table into a prioritized `CREATE INDEX` recommendation.
//!
//! ## Example
//!
//! ```
//! use querylens_core::advisor::{AdvisorConfig, IndexAdvisor};
//! use querylens_core::plan::PlanNode;
//! use querylens_core::statement::Statement;
//!
//! let plan = PlanNode::new("Seq Scan")
//!     .with_relation("users")
//!     .with_filter("(email = 'a@example.com'::text)")
//!     .with_cost(0.0, 2500.0);
//! let statements = vec![Statement::new("SELECT * FROM users WHERE email = $1").with_plan(plan)];
//!
//! let analysis = IndexAdvisor::new(AdvisorConfig::default()).analyze(&statements);
//! assert_eq!(analysis.recommendations[0].sql_command, "CREATE INDEX ON users(email);");
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::statement::Statement;

/// Default number of sequential scans on one table considered "frequent".
pub const DEFAULT_FREQUENT_SCAN_COUNT: u64 = 5;

/// Default average scan cost (planner units) considered "expensive".
pub const DEFAULT_EXPENSIVE_AVG_COST: f64 = 1000.0;

const SEQ_SCAN_MARKER: &str = "Seq Scan";
const INDEX_MARKER: &str = "Index";

static FILTER_COLUMN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:[a-z_][a-z0-9_]*\.)?([a-z_][a-z0-9_]*)\)?\s*(?:<>|!=|<=|>=|=|<|>|!?~~\*?|\bnot\s+i?like\b|\bi?like\b|\bis\b|\bin\b)",
    )
    .expect("Invalid filter column regex")
});

static FILTER_LITERAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").expect("Invalid filter literal regex"));

// `::text`, `::character varying(32)`, `::timestamp without time zone`, `::integer[]`
static FILTER_CAST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)::\s*"?[a-z_][a-z0-9_]*"?(?:\s+(?:varying|precision|with(?:out)?\s+time\s+zone))?(?:\(\s*[0-9]+(?:\s*,\s*[0-9]+)?\s*\))?(?:\[\])*"#,
    )
    .expect("Invalid filter cast regex")
});

static PLAIN_IDENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("Invalid identifier regex"));

const NON_COLUMN_WORDS: &[&str] = &["null", "true", "false", "and", "or", "not", "any", "all"];

/// Thresholds that decide recommendation priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Scans per table at or above which a table counts as frequently scanned
    pub frequent_scan_count: u64,
    /// Average scan cost at or above which a table counts as expensive to scan
    pub expensive_avg_cost: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            frequent_scan_count: DEFAULT_FREQUENT_SCAN_COUNT,
            expensive_avg_cost: DEFAULT_EXPENSIVE_AVG_COST,
        }
    }
}

impl AdvisorConfig {
    /// Sets the frequent-scan threshold (inclusive).
    #[must_use]
    pub fn with_frequent_scan_count(mut self, count: u64) -> Self {
        self.frequent_scan_count = count;
        self
    }

    /// Sets the expensive-cost threshold (inclusive).
    #[must_use]
    pub fn with_expensive_avg_cost(mut self, cost: f64) -> Self {
        self.expensive_avg_cost = cost;
        self
    }
}

/// Recommendation priority. Orders `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// Sequential scans of one table across a statement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialScanIssue {
    pub table: String,
    pub occurrences: u64,
    pub total_cost: f64,
    pub avg_cost: f64,
    /// Summed duration of the statements whose plans scan this table
    pub duration_ms: f64,
    /// First filter seen on a scan of this table
    pub filter_condition: Option<String>,
}

/// An index-backed node found in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexUsage {
    pub index_name: String,
    pub table: String,
    /// Index Scan, Index Only Scan, Bitmap Index Scan
    pub scan_type: String,
    pub cost: f64,
    pub rows: u64,
}

/// A suggested index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecommendation {
    pub table: String,
    pub columns: Vec<String>,
    pub priority: Priority,
    pub reason: String,
    pub estimated_impact: String,
    /// `CREATE INDEX` statement; empty when no column could be derived
    pub sql_command: String,
}

/// Result of walking the plans of a statement set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAnalysis {
    pub sequential_scans: Vec<SequentialScanIssue>,
    pub indexes_used: Vec<IndexUsage>,
    pub recommendations: Vec<IndexRecommendation>,
    pub total_seq_scans: u64,
    pub total_index_scans: u64,
    pub total_recommendations: usize,
    pub high_priority_recommendations: usize,
    /// Statements that carried a plan and were walked
    pub statements_with_plan: usize,
}

/// Plan walker producing [`IndexAnalysis`].
#[derive(Debug, Clone, Default)]
pub struct IndexAdvisor {
    config: AdvisorConfig,
}

impl IndexAdvisor {
    /// Creates an advisor with the given thresholds.
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    /// Walks every plan in `statements`. Statements without a plan are skipped.
    pub fn analyze(&self, statements: &[Statement]) -> IndexAnalysis {
        let mut scans: IndexMap<String, SequentialScanIssue> = IndexMap::new();
        let mut indexes_used = Vec::new();
        let mut total_seq_scans = 0u64;
        let mut total_index_scans = 0u64;
        let mut statements_with_plan = 0usize;

        for statement in statements {
            let Some(plan) = &statement.explain_plan else {
                continue;
            };
            statements_with_plan += 1;

            let mut scanned_by_statement: HashSet<String> = HashSet::new();
            plan.walk(&mut |node| {
                if node.node_type.contains(SEQ_SCAN_MARKER) {
                    total_seq_scans += 1;
                    let Some(table) = node.relation_name.as_deref().filter(|t| !t.is_empty())
                    else {
                        return;
                    };
                    let issue = scans
                        .entry(table.to_string())
                        .or_insert_with(|| SequentialScanIssue {
                            table: table.to_string(),
                            occurrences: 0,
                            total_cost: 0.0,
                            avg_cost: 0.0,
                            duration_ms: 0.0,
                            filter_condition: None,
                        });
                    issue.occurrences += 1;
                    issue.total_cost += node.total_cost;
                    if issue.filter_condition.is_none() {
                        issue.filter_condition = node.filter_condition.clone();
                    }
                    if scanned_by_statement.insert(table.to_string()) {
                        issue.duration_ms += statement.duration_ms;
                    }
                } else if node.node_type.contains(INDEX_MARKER) {
                    total_index_scans += 1;
                    indexes_used.push(IndexUsage {
                        index_name: node.index_name.clone().unwrap_or_default(),
                        table: node.relation_name.clone().unwrap_or_default(),
                        scan_type: node.node_type.clone(),
                        cost: node.total_cost,
                        rows: node.actual_rows.or(node.plan_rows).unwrap_or(0),
                    });
                }
            });
        }

        let mut sequential_scans: Vec<SequentialScanIssue> = scans
            .into_values()
            .map(|mut issue| {
                issue.avg_cost = issue.total_cost / issue.occurrences as f64;
                issue
            })
            .collect();
        sequential_scans.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.table.cmp(&b.table))
        });

        let mut recommendations: Vec<IndexRecommendation> = sequential_scans
            .iter()
            .map(|issue| self.recommend(issue))
            .collect();
        recommendations.sort_by(|a, b| a.priority.cmp(&b.priority));

        let high_priority_recommendations = recommendations
            .iter()
            .filter(|r| r.priority == Priority::High)
            .count();

        IndexAnalysis {
            total_recommendations: recommendations.len(),
            high_priority_recommendations,
            sequential_scans,
            indexes_used,
            recommendations,
            total_seq_scans,
            total_index_scans,
            statements_with_plan,
        }
    }

    /// Classifies a table's scans against the configured thresholds.
    ///
    /// Both thresholds are inclusive: reaching a threshold counts as elevated.
    pub fn priority_for(&self, occurrences: u64, avg_cost: f64) -> Priority {
        let frequent = occurrences >= self.config.frequent_scan_count;
        let expensive = avg_cost >= self.config.expensive_avg_cost;
        match (frequent, expensive) {
            (true, true) => Priority::High,
            (true, false) | (false, true) => Priority::Medium,
            (false, false) => Priority::Low,
        }
    }

    fn recommend(&self, issue: &SequentialScanIssue) -> IndexRecommendation {
        let columns = issue
            .filter_condition
            .as_deref()
            .map(extract_filter_columns)
            .unwrap_or_default();
        let priority = self.priority_for(issue.occurrences, issue.avg_cost);

        let plural = if issue.occurrences == 1 { "" } else { "s" };
        let mut reason = format!(
            "Table {} was read by {} sequential scan{} (average cost {:.2})",
            issue.table, issue.occurrences, plural, issue.avg_cost
        );
        if let Some(filter) = &issue.filter_condition {
            reason.push_str(&format!(" filtering on {filter}"));
        }

        let (estimated_impact, sql_command) = if columns.is_empty() {
            (
                format!(
                    "No indexable filter column found; review the queries scanning {} before adding an index",
                    issue.table
                ),
                String::new(),
            )
        } else {
            let column_list = columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!(
                    "{} impact: an index on ({}) should replace the sequential scan of {} with an index scan",
                    capitalize(&priority.to_string()),
                    columns.join(", "),
                    issue.table
                ),
                format!("CREATE INDEX ON {}({});", quote_ident(&issue.table), column_list),
            )
        };

        IndexRecommendation {
            table: issue.table.clone(),
            columns,
            priority,
            reason,
            estimated_impact,
            sql_command,
        }
    }
}

/// Analyzes `statements` with the default thresholds.
pub fn analyze_index_usage(statements: &[Statement]) -> IndexAnalysis {
    IndexAdvisor::default().analyze(statements)
}

/// Extracts column names compared in simple predicates of a plan filter.
///
/// Columns are returned in first-seen order without duplicates. Qualifiers
/// (`u.email`) and casts (`(email)::text`) are stripped. String literals are
/// blanked before matching, so neither their contents nor the type they are
/// cast to can be mistaken for a column.
pub fn extract_filter_columns(filter: &str) -> Vec<String> {
    let without_literals = FILTER_LITERAL_REGEX.replace_all(filter, "'?'");
    let predicates = FILTER_CAST_REGEX.replace_all(&without_literals, "");

    let mut columns: Vec<String> = Vec::new();
    for cap in FILTER_COLUMN_REGEX.captures_iter(&predicates) {
        let Some(col) = cap.get(1) else { continue };
        let name = col.as_str();
        if NON_COLUMN_WORDS.iter().any(|w| name.eq_ignore_ascii_case(w)) {
            continue;
        }
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }
    columns
}

fn quote_ident(ident: &str) -> String {
    if PLAIN_IDENT_REGEX.is_match(ident) {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
