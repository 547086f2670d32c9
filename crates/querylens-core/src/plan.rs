//! Execution plan model and EXPLAIN JSON parsing.
//!
//! [`PlanNode`] mirrors one node of PostgreSQL's `EXPLAIN (FORMAT JSON)`
//! output. It serializes with the engine's own key names, so a plan that was
//! persisted by a caller parses back into the same tree.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ExplainError;

/// One level of a query execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,
    #[serde(
        rename = "Relation Name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub relation_name: Option<String>,
    #[serde(rename = "Index Name", default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "Filter", default, skip_serializing_if = "Option::is_none")]
    pub filter_condition: Option<String>,
    #[serde(rename = "Index Cond", default, skip_serializing_if = "Option::is_none")]
    pub index_condition: Option<String>,
    #[serde(rename = "Startup Cost", default)]
    pub startup_cost: f64,
    #[serde(rename = "Total Cost", default)]
    pub total_cost: f64,
    #[serde(
        rename = "Plan Rows",
        default,
        deserialize_with = "rows_from_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub plan_rows: Option<u64>,
    #[serde(
        rename = "Actual Rows",
        default,
        deserialize_with = "rows_from_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub actual_rows: Option<u64>,
    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

// Newer PostgreSQL releases report fractional "Actual Rows" (per-loop average).
fn rows_from_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows: Option<f64> = Option::deserialize(deserializer)?;
    Ok(rows.map(|r| r.max(0.0).round() as u64))
}

impl PlanNode {
    /// Creates a leaf node of the given type.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            relation_name: None,
            index_name: None,
            filter_condition: None,
            index_condition: None,
            startup_cost: 0.0,
            total_cost: 0.0,
            plan_rows: None,
            actual_rows: None,
            children: Vec::new(),
        }
    }

    /// Sets the relation the node reads.
    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation_name = Some(relation.into());
        self
    }

    /// Sets the index the node reads.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index_name = Some(index.into());
        self
    }

    /// Sets the filter condition.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_condition = Some(filter.into());
        self
    }

    /// Sets startup and total cost.
    #[must_use]
    pub fn with_cost(mut self, startup: f64, total: f64) -> Self {
        self.startup_cost = startup;
        self.total_cost = total;
        self
    }

    /// Appends a child node.
    #[must_use]
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// Visits this node and all descendants depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a PlanNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Total number of nodes in this tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Returns true if both trees use the same access strategy.
    ///
    /// Node types, relations, indexes and tree shape are compared; costs,
    /// row counts and filter text are ignored because they vary between runs
    /// of the same plan.
    pub fn same_shape(&self, other: &PlanNode) -> bool {
        self.node_type == other.node_type
            && self.relation_name == other.relation_name
            && self.index_name == other.index_name
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b))
    }
}

/// Decides whether two statements of the same shape executed with different plans.
///
/// Only a pair of available plans can differ; a missing plan on either side is
/// "unknown", not "changed".
pub fn plans_differ(a: Option<&PlanNode>, b: Option<&PlanNode>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.same_shape(b),
        _ => false,
    }
}

/// Parses an EXPLAIN JSON document into its root plan node.
///
/// Accepts `[{"Plan": {...}}]` and `{"Plan": {...}}`. Drivers that hand the
/// document back as a JSON string are also accepted.
pub fn parse_explain(document: &Value) -> Result<PlanNode, ExplainError> {
    match document {
        Value::Array(items) => {
            let first = items
                .first()
                .ok_or_else(|| ExplainError::format("Empty plan array"))?;
            parse_plan_object(first)
        }
        Value::Object(_) => parse_plan_object(document),
        Value::String(text) => parse_explain_str(text),
        other => Err(ExplainError::format(format!(
            "Expected array or object, got {}",
            json_type_name(other)
        ))),
    }
}

/// Parses EXPLAIN JSON text into its root plan node.
pub fn parse_explain_str(text: &str) -> Result<PlanNode, ExplainError> {
    let document: Value = serde_json::from_str(text)?;
    if document.is_string() {
        return Err(ExplainError::format("Plan document is a bare string"));
    }
    parse_explain(&document)
}

fn parse_plan_object(value: &Value) -> Result<PlanNode, ExplainError> {
    let plan = value
        .get("Plan")
        .ok_or_else(|| ExplainError::format("Missing \"Plan\" key"))?;
    Ok(PlanNode::deserialize(plan)?)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
