use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{compare_values, BackendError, DatabaseBackend, Filter, Query, Row, RpcArgs};

/// Stored procedure implementation for the in-memory backend.
pub type RpcHandler =
    Arc<dyn Fn(&RpcArgs, &mut MemoryTables) -> Result<Value, BackendError> + Send + Sync>;

/// Table contents exposed to registered procedures.
pub type MemoryTables = BTreeMap<String, Vec<Row>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendOperation {
    Select,
    Insert,
    Update,
    Delete,
    Rpc,
}

/// Request log entry so callers can assert which calls reached the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendCall {
    pub operation: BackendOperation,
    pub target: String,
    pub payload: Option<Value>,
}

#[derive(Default)]
struct MemoryState {
    tables: MemoryTables,
    rpcs: HashMap<String, RpcHandler>,
    missing_columns: HashMap<String, HashSet<String>>,
    failing: HashSet<(String, BackendOperation)>,
    offline: bool,
    calls: Vec<BackendCall>,
}

/// Process-local stand-in for the hosted database.
///
/// Used when no remote URL is configured and throughout the test suites, where the
/// failure switches reproduce the outages and schema drift the pricing chain handles.
#[derive(Default, Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut state = self.state();
        let entries = state.tables.entry(table.to_string()).or_default();
        for mut row in rows {
            stamp_new_row(&mut row);
            entries.push(row);
        }
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn register_rpc(&self, function: &str, handler: RpcHandler) {
        self.state().rpcs.insert(function.to_string(), handler);
    }

    /// Simulate a column the schema cache does not know about.
    pub fn drop_column(&self, table: &str, column: &str) {
        let mut state = self.state();
        state
            .missing_columns
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string());
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut() {
                row.remove(column);
            }
        }
    }

    pub fn fail(&self, target: &str, operation: BackendOperation) {
        self.state()
            .failing
            .insert((target.to_string(), operation));
    }

    pub fn recover(&self, target: &str, operation: BackendOperation) {
        self.state()
            .failing
            .remove(&(target.to_string(), operation));
    }

    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl MemoryState {
    fn record(&mut self, operation: BackendOperation, target: &str, payload: Option<Value>) {
        self.calls.push(BackendCall {
            operation,
            target: target.to_string(),
            payload,
        });
    }

    fn check(&self, target: &str, operation: BackendOperation) -> Result<(), BackendError> {
        if self.offline {
            return Err(BackendError::Network("connection refused".to_string()));
        }
        if self.failing.contains(&(target.to_string(), operation)) {
            return Err(BackendError::Api {
                status: 503,
                code: None,
                message: format!("{target} is temporarily unavailable"),
            });
        }
        Ok(())
    }

    fn check_columns(&self, table: &str, row: &Row) -> Result<(), BackendError> {
        let Some(missing) = self.missing_columns.get(table) else {
            return Ok(());
        };
        let mut columns: Vec<&String> = row.keys().filter(|key| missing.contains(*key)).collect();
        columns.sort();
        match columns.first() {
            Some(column) => Err(BackendError::schema_cache_column(table, column)),
            None => Ok(()),
        }
    }
}

fn stamp_new_row(row: &mut Row) {
    let now = Value::String(Utc::now().to_rfc3339());
    if row.get("id").map_or(true, Value::is_null) {
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    if !row.contains_key("created_at") {
        row.insert("created_at".to_string(), now.clone());
    }
    if !row.contains_key("updated_at") {
        row.insert("updated_at".to_string(), now);
    }
}

#[async_trait]
impl DatabaseBackend for InMemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        let mut state = self.state();
        state.record(BackendOperation::Select, table, None);
        state.check(table, BackendOperation::Select)?;

        let mut rows: Vec<Row> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, BackendError> {
        let mut state = self.state();
        state.record(
            BackendOperation::Insert,
            table,
            Some(Value::Object(row.clone())),
        );
        state.check(table, BackendOperation::Insert)?;
        state.check_columns(table, &row)?;

        stamp_new_row(&mut row);
        let rows = state.tables.entry(table.to_string()).or_default();
        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23505".to_string()),
                message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
            });
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: Row,
    ) -> Result<Vec<Row>, BackendError> {
        let mut state = self.state();
        state.record(
            BackendOperation::Update,
            table,
            Some(Value::Object(patch.clone())),
        );
        state.check(table, BackendOperation::Update)?;
        state.check_columns(table, &patch)?;

        let now = Value::String(Utc::now().to_rfc3339());
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                if !patch.contains_key("updated_at") {
                    row.insert("updated_at".to_string(), now.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize, BackendError> {
        let mut state = self.state();
        state.record(BackendOperation::Delete, table, None);
        state.check(table, BackendOperation::Delete)?;

        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok(before - rows.len())
    }

    async fn rpc(&self, function: &str, args: RpcArgs) -> Result<Value, BackendError> {
        let mut state = self.state();
        let payload = match &args {
            RpcArgs::None => None,
            RpcArgs::Named(row) => Some(Value::Object(row.clone())),
            RpcArgs::Positional(values) => Some(Value::Array(values.clone())),
        };
        state.record(BackendOperation::Rpc, function, payload);
        state.check(function, BackendOperation::Rpc)?;

        let handler = state
            .rpcs
            .get(function)
            .cloned()
            .ok_or_else(|| BackendError::missing_function(function))?;
        handler(&args, &mut state.tables)
    }
}
