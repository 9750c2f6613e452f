//! Record source abstraction - the "fetch one page of records" primitive
//!
//! Every loader in this crate talks to the backend exclusively through
//! [`RecordSource`]. The live implementation is [`crate::core::odata::ODataClient`];
//! [`MemorySource`] serves canned entity sets from memory or a JSON snapshot.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

/// One page of raw records
pub type Page = Vec<Value>;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request for {entity_set} failed: {message}")]
    Transport { entity_set: String, message: String },

    #[error("{entity_set} query failed with status {status}: {body}")]
    Status {
        entity_set: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response for {entity_set}: {message}")]
    Malformed { entity_set: String, message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Failed to read snapshot {path}: {message}")]
    Snapshot { path: String, message: String },
}

impl FetchError {
    /// Malformed bodies are absorbed by the pagination layer; everything else propagates
    pub fn is_malformed(&self) -> bool {
        matches!(self, FetchError::Malformed { .. })
    }
}

/// The "fetch page" primitive
pub trait RecordSource: Send + Sync {
    /// Fetch a single page of records for the query
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, FetchError>;
}

// =========================================================================
// Filters
// =========================================================================

/// A literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl FilterValue {
    fn to_odata(&self) -> String {
        match self {
            FilterValue::Int(n) => n.to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FilterValue::Int(n) => value.as_i64() == Some(*n),
            FilterValue::Bool(b) => value.as_bool() == Some(*b),
            FilterValue::Str(s) => value.as_str() == Some(s.as_str()),
        }
    }
}

/// A typed OData `$filter` predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, FilterValue),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// `field eq value`
    pub fn eq(field: impl Into<String>, value: FilterValue) -> Self {
        Filter::Eq(field.into(), value)
    }

    /// Active, non-deleted records
    pub fn active() -> Self {
        Filter::And(vec![
            Filter::eq("Active", FilterValue::Bool(true)),
            Filter::eq("Deleted", FilterValue::Bool(false)),
        ])
    }

    /// OR-join of `field eq id` over the given ids
    pub fn any_of(field: &str, ids: impl IntoIterator<Item = i64>) -> Self {
        Filter::Or(
            ids.into_iter()
                .map(|id| Filter::eq(field, FilterValue::Int(id)))
                .collect(),
        )
    }

    /// Combine with another predicate
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Render as OData `$filter` text
    pub fn to_odata(&self) -> String {
        match self {
            Filter::Eq(field, value) => format!("{} eq {}", field, value.to_odata()),
            Filter::And(parts) => join_parts(parts, " and "),
            Filter::Or(parts) => join_parts(parts, " or "),
        }
    }

    /// Evaluate against a JSON record. Missing fields never compare equal.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Filter::Eq(field, value) => record.get(field).is_some_and(|v| value.matches(v)),
            Filter::And(parts) => parts.iter().all(|p| p.matches(record)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(record)),
        }
    }
}

fn join_parts(parts: &[Filter], sep: &str) -> String {
    parts
        .iter()
        .map(|p| match p {
            Filter::Eq(..) => p.to_odata(),
            _ if parts.len() == 1 => p.to_odata(),
            _ => format!("({})", p.to_odata()),
        })
        .collect::<Vec<_>>()
        .join(sep)
}

// =========================================================================
// Page query
// =========================================================================

/// Parameters for a single page request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageQuery {
    pub entity_set: String,
    pub filter: Option<Filter>,
    pub select: Vec<String>,
    pub order_by: Option<String>,
    pub top: Option<usize>,
    pub skip: Option<usize>,
}

impl PageQuery {
    /// Create a query for an entity set
    pub fn new(entity_set: impl Into<String>) -> Self {
        Self {
            entity_set: entity_set.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_select(mut self, fields: &[&str]) -> Self {
        self.select = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Restrict to a `$top`/`$skip` window
    pub fn page(mut self, top: usize, skip: usize) -> Self {
        self.top = Some(top);
        self.skip = Some(skip);
        self
    }
}

// =========================================================================
// In-memory source
// =========================================================================

/// An in-memory record source.
///
/// Serves entity sets from memory, honoring `$filter`, `$orderby`, `$skip`
/// and `$top`. Every issued query is recorded. Individual entity sets can be
/// made to fail or to return malformed bodies.
#[derive(Debug, Default)]
pub struct MemorySource {
    sets: HashMap<String, Vec<Value>>,
    /// Calls to the entity set at or beyond this index fail with a transport error
    fail_from: HashMap<String, usize>,
    malformed: HashSet<String>,
    calls: Mutex<Vec<PageQuery>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON snapshot of the form `{ "EntitySet": [ {...}, ... ], ... }`
    pub fn from_snapshot_file(path: &Path) -> Result<Self, FetchError> {
        let snapshot_error = |message: String| FetchError::Snapshot {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        let sets: HashMap<String, Vec<Value>> =
            serde_json::from_str(&content).map_err(|e| snapshot_error(e.to_string()))?;

        Ok(Self {
            sets,
            ..Default::default()
        })
    }

    /// Add (or replace) an entity set
    pub fn with_set(mut self, entity_set: &str, records: Vec<Value>) -> Self {
        self.sets.insert(entity_set.to_string(), records);
        self
    }

    /// Fail every call to the entity set
    pub fn failing(self, entity_set: &str) -> Self {
        self.failing_from_call(entity_set, 0)
    }

    /// Succeed for the first `n` calls to the entity set, then fail
    pub fn failing_from_call(mut self, entity_set: &str, n: usize) -> Self {
        self.fail_from.insert(entity_set.to_string(), n);
        self
    }

    /// Respond to the entity set with an unparseable body
    pub fn malformed(mut self, entity_set: &str) -> Self {
        self.malformed.insert(entity_set.to_string());
        self
    }

    /// All queries issued so far
    pub fn calls(&self) -> Vec<PageQuery> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of queries issued against one entity set
    pub fn call_count(&self, entity_set: &str) -> usize {
        self.calls()
            .iter()
            .filter(|q| q.entity_set == entity_set)
            .count()
    }

    /// Total number of queries issued
    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    fn record_call(&self, query: &PageQuery) -> usize {
        match self.calls.lock() {
            Ok(mut calls) => {
                let prior = calls
                    .iter()
                    .filter(|q| q.entity_set == query.entity_set)
                    .count();
                calls.push(query.clone());
                prior
            }
            Err(_) => 0,
        }
    }
}

impl RecordSource for MemorySource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, FetchError> {
        let call_index = self.record_call(query);

        if let Some(&n) = self.fail_from.get(&query.entity_set) {
            if call_index >= n {
                return Err(FetchError::Transport {
                    entity_set: query.entity_set.clone(),
                    message: "connection refused".to_string(),
                });
            }
        }

        if self.malformed.contains(&query.entity_set) {
            return Err(FetchError::Malformed {
                entity_set: query.entity_set.clone(),
                message: "expected value at line 1 column 1".to_string(),
            });
        }

        let Some(records) = self.sets.get(&query.entity_set) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Value> = records
            .iter()
            .filter(|r| query.filter.as_ref().map_or(true, |f| f.matches(r)))
            .collect();

        if let Some(ref field) = query.order_by {
            let field = field.split_whitespace().next().unwrap_or(field);
            matched.sort_by(|a, b| compare_field(a.get(field), b.get(field)));
        }

        let skip = query.skip.unwrap_or(0);
        let top = query.top.unwrap_or(usize::MAX);

        Ok(matched.into_iter().skip(skip).take(top).cloned().collect())
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        _ => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_active_filter_renders_odata() {
        assert_eq!(
            Filter::active().to_odata(),
            "Active eq true and Deleted eq false"
        );
    }

    #[test]
    fn test_any_of_renders_or_predicate() {
        let filter = Filter::any_of("ID", [1, 2, 3]);
        assert_eq!(filter.to_odata(), "ID eq 1 or ID eq 2 or ID eq 3");
    }

    #[test]
    fn test_nested_filters_are_parenthesised() {
        let filter = Filter::active().and(Filter::any_of("ID", [4, 5]));
        assert_eq!(
            filter.to_odata(),
            "Active eq true and Deleted eq false and (ID eq 4 or ID eq 5)"
        );
    }

    #[test]
    fn test_string_values_are_quoted_and_escaped() {
        let filter = Filter::eq("OrgCode", FilterValue::Str("O'Brien".to_string()));
        assert_eq!(filter.to_odata(), "OrgCode eq 'O''Brien'");
    }

    #[test]
    fn test_filter_matches_records() {
        let record = json!({"ID": 4, "Active": true, "Deleted": false});
        assert!(Filter::active().matches(&record));
        assert!(Filter::any_of("ID", [3, 4]).matches(&record));
        assert!(!Filter::any_of("ID", [5]).matches(&record));

        // Missing fields never match
        assert!(!Filter::active().matches(&json!({"ID": 4})));
    }

    #[test]
    fn test_memory_source_pages_and_filters() {
        let source = MemorySource::new().with_set(
            "Location",
            (1..=5).rev().map(|i| json!({"ID": i, "Active": true, "Deleted": i == 3})).collect(),
        );

        let query = PageQuery::new("Location")
            .with_filter(Filter::active())
            .with_order_by("ID")
            .page(2, 1);
        let page = source.fetch_page(&query).unwrap();

        let ids: Vec<i64> = page.iter().filter_map(|r| r["ID"].as_i64()).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(source.call_count("Location"), 1);
    }

    #[test]
    fn test_memory_source_unknown_set_is_empty() {
        let source = MemorySource::new();
        let page = source.fetch_page(&PageQuery::new("Nothing")).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_memory_source_failure_injection() {
        let source = MemorySource::new()
            .with_set("User", vec![json!({"ID": 1})])
            .failing_from_call("User", 1)
            .malformed("Department");

        assert!(source.fetch_page(&PageQuery::new("User")).is_ok());
        assert!(matches!(
            source.fetch_page(&PageQuery::new("User")),
            Err(FetchError::Transport { .. })
        ));
        assert!(source
            .fetch_page(&PageQuery::new("Department"))
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_snapshot_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, r#"{"Location": [{"ID": 1, "Description": "Clayton"}]}"#).unwrap();

        let source = MemorySource::from_snapshot_file(&path).unwrap();
        let page = source.fetch_page(&PageQuery::new("Location")).unwrap();
        assert_eq!(page.len(), 1);

        let missing = MemorySource::from_snapshot_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(FetchError::Snapshot { .. })));
    }
}
