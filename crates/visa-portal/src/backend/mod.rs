//! Access to the hosted relational database.
//!
//! Everything the service persists goes through [`DatabaseBackend`], which mirrors the
//! PostgREST surface the hosted database exposes: table reads and writes keyed by equality
//! filters, plus named stored-procedure calls.

mod error;
mod memory;
mod rest;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use error::{BackendError, MissingColumn};
pub use memory::{BackendCall, BackendOperation, InMemoryBackend, MemoryTables, RpcHandler};
pub use rest::RestBackend;

/// A single table row as returned by the database.
pub type Row = serde_json::Map<String, Value>;

/// Equality filter on one column (`column=eq.value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn by_id(id: impl ToString) -> Self {
        Self::eq("id", id.to_string())
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column)
            .map(|value| value == &self.value)
            .unwrap_or(false)
    }

    /// Value rendered the way PostgREST expects it in a query string.
    pub fn rendered_value(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Row selection: conjunctive equality filters, an optional order, and a limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }
}

/// Arguments for a stored-procedure call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcArgs {
    None,
    Named(Row),
    Positional(Vec<Value>),
}

#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError>;
    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError>;
    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: Row,
    ) -> Result<Vec<Row>, BackendError>;
    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize, BackendError>;
    async fn rpc(&self, function: &str, args: RpcArgs) -> Result<Value, BackendError>;
}

/// Serialize a typed value into a row payload.
pub fn encode_row<T: Serialize>(value: &T) -> Result<Row, BackendError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(BackendError::Decode(format!(
            "expected an object payload, found {other}"
        ))),
        Err(err) => Err(BackendError::Decode(err.to_string())),
    }
}

pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, BackendError> {
    serde_json::from_value(Value::Object(row)).map_err(|err| BackendError::Decode(err.to_string()))
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(decode_row).collect()
}

/// Total order over JSON scalars used when sorting rows locally.
pub(crate) fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn query_matches_all_filters() {
        let query = Query::all().eq("country_id", "c-1").eq("is_active", true);
        assert!(query.matches(&row(json!({ "country_id": "c-1", "is_active": true }))));
        assert!(!query.matches(&row(json!({ "country_id": "c-1", "is_active": false }))));
        assert!(!query.matches(&row(json!({ "is_active": true }))));
    }

    #[test]
    fn rendered_value_strips_string_quotes() {
        assert_eq!(Filter::eq("name", "Japan").rendered_value(), "Japan");
        assert_eq!(Filter::eq("is_active", true).rendered_value(), "true");
        assert_eq!(Filter::eq("processing_days", 7).rendered_value(), "7");
    }

    #[test]
    fn nulls_sort_last() {
        let one = json!(1);
        assert_eq!(compare_values(Some(&one), None), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), Some(&one)), Ordering::Greater);
    }
}
