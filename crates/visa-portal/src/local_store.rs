//! Local JSON store backing "mock mode".
//!
//! When the pricing chain cannot reach the database, synthetic records land here and the
//! affected resource is flagged. Reads and writes for a flagged resource stay local until an
//! operator explicitly exits mock mode. The store also remembers columns the database's schema
//! cache rejected so later payloads can leave them out.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::Row;
use crate::workflows::catalog::ResourceKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("local store io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("local store at {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    mock_mode: BTreeSet<ResourceKind>,
    #[serde(default)]
    records: BTreeMap<String, Vec<Row>>,
    #[serde(default)]
    schema_errors: BTreeMap<String, BTreeSet<String>>,
}

/// Notice shown while a resource is served from local data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockModeBanner {
    pub resource: ResourceKind,
    pub message: String,
    pub records: usize,
}

pub struct LocalStore {
    path: Option<PathBuf>,
    snapshot: Mutex<Snapshot>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Open the store at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Snapshot::default(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path: Some(path),
            snapshot: Mutex::new(snapshot),
        })
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let encoded = serde_json::to_vec_pretty(snapshot).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(io_error)?;
        fs::rename(&staging, path).map_err(io_error)
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut Snapshot) -> T) -> Result<T, StoreError> {
        let mut snapshot = self.snapshot();
        let outcome = apply(&mut snapshot);
        self.persist(&snapshot)?;
        Ok(outcome)
    }

    pub fn is_mock(&self, kind: ResourceKind) -> bool {
        self.snapshot().mock_mode.contains(&kind)
    }

    pub fn mock_resources(&self) -> Vec<ResourceKind> {
        self.snapshot().mock_mode.iter().copied().collect()
    }

    pub fn enter_mock_mode(&self, kind: ResourceKind) -> Result<(), StoreError> {
        let entered = self.mutate(|snapshot| snapshot.mock_mode.insert(kind))?;
        if entered {
            warn!(resource = %kind, "entered mock mode");
        }
        Ok(())
    }

    /// Clear the flag and the synthetic records. Returns whether the resource was flagged.
    pub fn exit_mock_mode(&self, kind: ResourceKind) -> Result<bool, StoreError> {
        let exited = self.mutate(|snapshot| {
            snapshot.records.remove(kind.table());
            snapshot.mock_mode.remove(&kind)
        })?;
        if exited {
            info!(resource = %kind, "exited mock mode");
        }
        Ok(exited)
    }

    pub fn banners(&self) -> Vec<MockModeBanner> {
        let snapshot = self.snapshot();
        snapshot
            .mock_mode
            .iter()
            .map(|kind| MockModeBanner {
                resource: *kind,
                message: format!(
                    "{} are being served from local mock data. Exit mock mode to reconnect to the database.",
                    kind.label()
                ),
                records: snapshot
                    .records
                    .get(kind.table())
                    .map_or(0, Vec::len),
            })
            .collect()
    }

    pub fn records(&self, kind: ResourceKind) -> Vec<Row> {
        self.snapshot()
            .records
            .get(kind.table())
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, kind: ResourceKind, id: &str) -> Option<Row> {
        self.records(kind).into_iter().find(|row| row_id(row) == Some(id))
    }

    /// Insert or replace a record by `id`, stamping identity and timestamps like the database would.
    pub fn upsert_record(&self, kind: ResourceKind, mut row: Row) -> Result<Row, StoreError> {
        let now = Value::String(Utc::now().to_rfc3339());
        if row.get("id").map_or(true, Value::is_null) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        row.entry("created_at".to_string())
            .or_insert_with(|| now.clone());
        row.insert("updated_at".to_string(), now);

        self.mutate(|snapshot| {
            let records = snapshot.records.entry(kind.table().to_string()).or_default();
            let id = row_id(&row).map(str::to_string);
            match records
                .iter_mut()
                .find(|existing| row_id(existing).map(str::to_string) == id)
            {
                Some(existing) => {
                    if let Some(created) = existing.get("created_at").cloned() {
                        row.insert("created_at".to_string(), created);
                    }
                    *existing = row.clone();
                }
                None => records.push(row.clone()),
            }
            row
        })
    }

    pub fn remove_record(&self, kind: ResourceKind, id: &str) -> Result<bool, StoreError> {
        self.mutate(|snapshot| {
            let Some(records) = snapshot.records.get_mut(kind.table()) else {
                return false;
            };
            let before = records.len();
            records.retain(|row| row_id(row) != Some(id));
            records.len() != before
        })
    }

    /// Drop every record whose `column` holds `value`, as a cascading delete would.
    pub fn remove_matching(
        &self,
        kind: ResourceKind,
        column: &str,
        value: &str,
    ) -> Result<usize, StoreError> {
        self.mutate(|snapshot| {
            let Some(records) = snapshot.records.get_mut(kind.table()) else {
                return 0;
            };
            let before = records.len();
            records.retain(|row| row.get(column).and_then(Value::as_str) != Some(value));
            before - records.len()
        })
    }

    /// Remember a column the schema cache rejected. Returns `true` when it is new.
    pub fn remember_missing_column(&self, table: &str, column: &str) -> Result<bool, StoreError> {
        self.mutate(|snapshot| {
            snapshot
                .schema_errors
                .entry(table.to_string())
                .or_default()
                .insert(column.to_string())
        })
    }

    pub fn missing_columns(&self, table: &str) -> BTreeSet<String> {
        self.snapshot()
            .schema_errors
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn schema_errors(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.snapshot().schema_errors.clone()
    }

    pub fn forget_schema_errors(&self, table: Option<&str>) -> Result<(), StoreError> {
        self.mutate(|snapshot| match table {
            Some(table) => {
                snapshot.schema_errors.remove(table);
            }
            None => snapshot.schema_errors.clear(),
        })
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}
