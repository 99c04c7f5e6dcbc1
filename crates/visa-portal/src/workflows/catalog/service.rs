use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cache::{Mutation, QueryCache, QueryKey};
use super::domain::{Country, VisaPackage};
use super::resource::{Resource, ResourceKind};
use super::table::{sort_rows, AdminCountryRow, SortState};
use super::validation::{Validate, ValidationError};
use crate::backend::{
    decode_row, decode_rows, BackendError, DatabaseBackend, Filter, Query, Row,
};
use crate::local_store::{LocalStore, StoreError};

/// Generic admin CRUD over every catalog table.
///
/// Reads go through the query cache, writes invalidate it. Resources flagged in mock mode
/// are read from and written to the local store instead of the database.
pub struct CatalogService<B: ?Sized> {
    backend: Arc<B>,
    cache: Arc<QueryCache>,
    store: Arc<LocalStore>,
}

impl<B> CatalogService<B>
where
    B: DatabaseBackend + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>, cache: Arc<QueryCache>, store: Arc<LocalStore>) -> Self {
        Self {
            backend,
            cache,
            store,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Rows of `R` matching `query`, from the mock store when the resource is flagged.
    pub async fn select<R: Resource>(&self, query: Query) -> Result<Vec<R>, CatalogError> {
        let rows = if self.store.is_mock(R::KIND) {
            let mut rows: Vec<Row> = self
                .store
                .records(R::KIND)
                .into_iter()
                .filter(|row| query.matches(row))
                .collect();
            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }
            rows
        } else {
            self.backend.select(R::KIND.table(), &query).await?
        };
        Ok(decode_rows(rows)?)
    }

    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, CatalogError> {
        if self.store.is_mock(R::KIND) {
            return self.select(Query::all()).await;
        }
        self.cache
            .get_or_load(QueryKey::AdminList(R::KIND), || {
                self.select(Query::all().order_by(R::default_order(), true))
            })
            .await
    }

    pub async fn get<R: Resource>(&self, id: Uuid) -> Result<R, CatalogError> {
        self.select::<R>(Query::all().eq("id", id.to_string()).limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound { kind: R::KIND, id })
    }

    pub async fn create<R: Resource>(&self, draft: R::Draft) -> Result<R, CatalogError> {
        draft.validate()?;
        if let Some((column, scope)) = R::exclusive_activation(&draft) {
            self.ensure_single_active::<R>(column, scope, None).await?;
        }

        let row = R::draft_row(&draft)?;
        let stored = if self.store.is_mock(R::KIND) {
            self.store.upsert_record(R::KIND, row)?
        } else {
            self.backend.insert(R::KIND.table(), row).await?
        };
        let created: R = decode_row(stored)?;

        info!(resource = %R::KIND, id = %created.id(), "catalog row created");
        self.cache
            .invalidate(Mutation::new(R::KIND, created.country_scope()));
        Ok(created)
    }

    pub async fn update<R: Resource>(&self, id: Uuid, draft: R::Draft) -> Result<R, CatalogError> {
        draft.validate()?;
        if let Some((column, scope)) = R::exclusive_activation(&draft) {
            self.ensure_single_active::<R>(column, scope, Some(id)).await?;
        }

        let previous: R = self.get(id).await?;
        let row = R::draft_row(&draft)?;
        let updated: R = decode_row(self.write_patch(R::KIND, id, row).await?)?;

        info!(resource = %R::KIND, %id, "catalog row updated");
        self.cache
            .invalidate(Mutation::new(R::KIND, updated.country_scope()));
        if previous.country_scope() != updated.country_scope() {
            self.cache
                .invalidate(Mutation::new(R::KIND, previous.country_scope()));
        }
        Ok(updated)
    }

    /// Delete a row after its dependents. The requests are sequential and not atomic.
    pub async fn delete<R: Resource>(&self, id: Uuid) -> Result<(), CatalogError> {
        let existing: R = self.get(id).await?;
        let scope = existing.country_scope();
        let key = id.to_string();

        self.delete_dependents(R::KIND, key.clone(), scope).await?;

        if self.store.is_mock(R::KIND) {
            self.store.remove_record(R::KIND, &key)?;
        } else {
            let removed = self.backend.delete(R::KIND.table(), &Filter::by_id(id)).await?;
            if removed == 0 {
                return Err(CatalogError::NotFound { kind: R::KIND, id });
            }
        }

        info!(resource = %R::KIND, %id, "catalog row deleted");
        self.cache.invalidate(Mutation::new(R::KIND, scope));
        Ok(())
    }

    /// Remove every row referencing `parent`, grandchildren before children.
    async fn delete_dependents(
        &self,
        parent: ResourceKind,
        parent_id: String,
        scope: Option<Uuid>,
    ) -> Result<(), CatalogError> {
        let mut pending = Vec::new();
        push_dependents(&mut pending, parent, &parent_id);

        while let Some((kind, column, key, expanded)) = pending.pop() {
            if !expanded && !kind.dependents().is_empty() {
                let child_ids = self.referencing_ids(kind, column, &key).await?;
                pending.push((kind, column, key, true));
                for child_id in &child_ids {
                    push_dependents(&mut pending, kind, child_id);
                }
                continue;
            }

            let removed = if self.store.is_mock(kind) {
                self.store.remove_matching(kind, column, &key)?
            } else {
                self.backend
                    .delete(kind.table(), &Filter::eq(column, key.as_str()))
                    .await?
            };
            debug!(resource = %kind, removed, parent = %key, "removed dependent rows");
            self.cache.invalidate(Mutation::new(kind, scope));
        }
        Ok(())
    }

    async fn referencing_ids(
        &self,
        kind: ResourceKind,
        column: &str,
        key: &str,
    ) -> Result<Vec<String>, CatalogError> {
        let query = Query::all().eq(column, key);
        let rows: Vec<Row> = if self.store.is_mock(kind) {
            self.store
                .records(kind)
                .into_iter()
                .filter(|row| query.matches(row))
                .collect()
        } else {
            self.backend.select(kind.table(), &query).await?
        };
        Ok(rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// Flip a package's `is_active` flag. Only that column is written.
    pub async fn set_package_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> Result<VisaPackage, CatalogError> {
        let existing: VisaPackage = self.get(id).await?;
        if is_active {
            self.ensure_single_active::<VisaPackage>("country_id", existing.country_id, Some(id))
                .await?;
        }

        let mut patch = Row::new();
        patch.insert("is_active".to_string(), Value::Bool(is_active));
        let updated: VisaPackage =
            decode_row(self.write_patch(ResourceKind::VisaPackages, id, patch).await?)?;

        info!(%id, is_active, "visa package activation changed");
        self.cache.invalidate(Mutation::new(
            ResourceKind::VisaPackages,
            Some(updated.country_id),
        ));
        Ok(updated)
    }

    /// Countries joined with their active package, sorted for the admin table.
    pub async fn admin_countries(
        &self,
        sort: SortState,
    ) -> Result<Vec<AdminCountryRow>, CatalogError> {
        let countries = self.list::<Country>().await?;
        let packages = self.list::<VisaPackage>().await?;

        let mut rows: Vec<AdminCountryRow> = countries
            .into_iter()
            .map(|country| {
                let package = active_package_for(&packages, country.id).cloned();
                AdminCountryRow { country, package }
            })
            .collect();
        sort_rows(&mut rows, sort);
        Ok(rows)
    }

    pub fn invalidate(&self, mutation: Mutation) -> Vec<QueryKey> {
        self.cache.invalidate(mutation)
    }

    async fn write_patch(
        &self,
        kind: ResourceKind,
        id: Uuid,
        patch: Row,
    ) -> Result<Row, CatalogError> {
        if self.store.is_mock(kind) {
            let mut merged = self
                .store
                .record(kind, &id.to_string())
                .ok_or(CatalogError::NotFound { kind, id })?;
            merged.extend(patch);
            return Ok(self.store.upsert_record(kind, merged)?);
        }

        self.backend
            .update(kind.table(), &Filter::by_id(id), patch)
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound { kind, id })
    }

    async fn ensure_single_active<R: Resource>(
        &self,
        column: &'static str,
        scope: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<(), CatalogError> {
        let active = self
            .select::<R>(
                Query::all()
                    .eq(column, scope.to_string())
                    .eq("is_active", true),
            )
            .await?;

        match active.iter().map(|row| row.id()).find(|id| Some(*id) != exclude) {
            Some(existing) => {
                warn!(resource = %R::KIND, %scope, %existing, "rejected second active row");
                Err(ValidationError::DuplicateActivePackage {
                    country_id: scope,
                    existing,
                }
                .into())
            }
            None => Ok(()),
        }
    }
}

/// A dependent table still to clear: `(kind, column, parent key, children already queued)`.
type PendingDelete = (ResourceKind, &'static str, String, bool);

fn push_dependents(pending: &mut Vec<PendingDelete>, parent: ResourceKind, parent_id: &str) {
    for (table, column) in parent.dependents().iter().rev() {
        if let Some(child) = ResourceKind::parse(table) {
            pending.push((child, *column, parent_id.to_string(), false));
        }
    }
}

/// The country's active package, or its first package when none is active.
pub(crate) fn active_package_for(packages: &[VisaPackage], country_id: Uuid) -> Option<&VisaPackage> {
    packages
        .iter()
        .find(|package| package.country_id == country_id && package.is_active)
        .or_else(|| packages.iter().find(|package| package.country_id == country_id))
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{kind} row {id} not found")]
    NotFound { kind: ResourceKind, id: Uuid },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CatalogError::NotFound { .. } | CatalogError::Backend(BackendError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            CatalogError::Backend(_) => StatusCode::BAD_GATEWAY,
            CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();
        let payload = match &self {
            CatalogError::Validation(error) => json!({
                "error": self.to_string(),
                "validation": error,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, axum::Json(payload)).into_response()
    }
}
