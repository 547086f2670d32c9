//! Log records and the statements extracted from them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::normalize::fingerprint;
use crate::plan::PlanNode;

/// One structured log record handed over by the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl LogRecord {
    /// Creates a record with no fields.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a field value.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Request correlation identifiers carried through from the log record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// One SQL execution captured from log evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text as it appeared, placeholders included.
    pub raw_query: String,
    /// Parameter-erased shape, see [`crate::normalize::normalize`].
    pub normalized_query: String,
    /// Identity hash of `normalized_query`.
    pub query_hash: String,
    pub duration_ms: f64,
    pub table: String,
    pub operation: String,
    pub rows: i64,
    /// Captured parameter evidence, verbatim.
    pub variables_raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql_operation: Option<String>,
    #[serde(default)]
    pub correlation: Correlation,
    /// Every field the extractor did not interpret, for human inspection.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain_plan: Option<PlanNode>,
}

impl Statement {
    /// Creates a statement from raw SQL text, computing its shape and hash.
    pub fn new(raw_query: impl Into<String>) -> Self {
        let raw_query = raw_query.into();
        let (normalized_query, query_hash) = fingerprint(&raw_query);
        Self {
            raw_query,
            normalized_query,
            query_hash,
            duration_ms: 0.0,
            table: String::new(),
            operation: String::new(),
            rows: 0,
            variables_raw: String::new(),
            graphql_operation: None,
            correlation: Correlation::default(),
            extra_fields: BTreeMap::new(),
            explain_plan: None,
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sets the target table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the captured variables.
    #[must_use]
    pub fn with_variables(mut self, variables_raw: impl Into<String>) -> Self {
        self.variables_raw = variables_raw.into();
        self
    }

    /// Sets the execution plan.
    #[must_use]
    pub fn with_plan(mut self, plan: PlanNode) -> Self {
        self.explain_plan = Some(plan);
        self
    }

    /// Attaches an execution plan unless one is already present.
    ///
    /// Returns false and leaves the existing plan untouched if the statement
    /// was already explained.
    pub fn attach_plan(&mut self, plan: PlanNode) -> bool {
        if self.explain_plan.is_some() {
            return false;
        }
        self.explain_plan = Some(plan);
        true
    }

    /// Whether an execution plan has been attached.
    pub fn has_plan(&self) -> bool {
        self.explain_plan.is_some()
    }

    /// Builds the persistence upsert record for this statement's plan.
    ///
    /// Returns `None` until a plan has been attached.
    pub fn plan_record(&self) -> Option<PlanRecord> {
        let plan = self.explain_plan.as_ref()?;
        Some(PlanRecord {
            query_hash: self.query_hash.clone(),
            normalized_query: self.normalized_query.clone(),
            explain_plan: serde_json::to_value(plan).ok()?,
        })
    }
}

/// What a storage collaborator needs to upsert a plan by `(execution, query_hash)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub query_hash: String,
    pub normalized_query: String,
    pub explain_plan: serde_json::Value,
}
