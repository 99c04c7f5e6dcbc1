use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::PricingError;
use crate::backend::{compare_values, DatabaseBackend, Filter, Query, Row, RpcArgs};
use crate::workflows::catalog::{CatalogService, Mutation, ResourceKind};

const TABLE_COLUMNS_RPC: &str = "get_table_columns";
const REFRESH_SCHEMA_RPC: &str = "refresh_schema_cache";

/// Where a column listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    Procedure,
    SampleRow,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<String>,
    pub source: ColumnSource,
    /// Columns the schema cache rejected during earlier writes.
    pub missing: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairReport {
    pub totals_recomputed: Vec<String>,
    pub packages_deactivated: Vec<String>,
    pub skipped_total_price: bool,
}

/// Inspects and heals the hosted schema: column listings, cache refreshes, data repair.
pub struct SchemaDoctor<B: ?Sized> {
    catalog: Arc<CatalogService<B>>,
}

impl<B> SchemaDoctor<B>
where
    B: DatabaseBackend + ?Sized + 'static,
{
    pub fn new(catalog: Arc<CatalogService<B>>) -> Self {
        Self { catalog }
    }

    /// List a table's columns via `get_table_columns`, falling back to the keys of one row.
    pub async fn inspect(&self, kind: ResourceKind) -> Result<TableSchema, PricingError> {
        let backend = self.catalog.backend();
        let table = kind.table();
        let mut args = Row::new();
        args.insert("p_table_name".to_string(), Value::String(table.to_string()));

        let (columns, source) = match backend.rpc(TABLE_COLUMNS_RPC, RpcArgs::Named(args)).await {
            Ok(value) => (column_names(&value), ColumnSource::Procedure),
            Err(error) => {
                warn!(table, %error, "column listing procedure failed; sampling a row");
                let rows = backend.select(table, &Query::all().limit(1)).await?;
                match rows.into_iter().next() {
                    Some(row) => (row.keys().cloned().collect(), ColumnSource::SampleRow),
                    None => (Vec::new(), ColumnSource::Unknown),
                }
            }
        };

        Ok(TableSchema {
            table: table.to_string(),
            columns,
            source,
            missing: self.catalog.store().missing_columns(table),
        })
    }

    /// Ask the database to reload its schema cache, then forget remembered missing columns.
    pub async fn refresh(&self) -> Result<(), PricingError> {
        self.catalog
            .backend()
            .rpc(REFRESH_SCHEMA_RPC, RpcArgs::None)
            .await?;
        self.catalog.store().forget_schema_errors(None)?;
        info!("schema cache refreshed");
        Ok(())
    }

    /// Recompute stale package totals and keep only the newest active package per country.
    pub async fn repair(&self) -> Result<RepairReport, PricingError> {
        let backend = self.catalog.backend();
        let table = ResourceKind::VisaPackages.table();
        let rows = backend.select(table, &Query::all()).await?;
        let mut report = RepairReport {
            skipped_total_price: self
                .catalog
                .store()
                .missing_columns(table)
                .contains("total_price"),
            ..RepairReport::default()
        };

        if !report.skipped_total_price {
            for row in &rows {
                let Some(id) = row.get("id").cloned() else {
                    continue;
                };
                let expected = fee(row, "government_fee") + fee(row, "service_fee");
                let stale = match row.get("total_price") {
                    None => false,
                    Some(Value::Number(total)) => {
                        (total.as_f64().unwrap_or_default() - expected).abs() > f64::EPSILON
                    }
                    Some(_) => true,
                };
                if !stale {
                    continue;
                }
                let mut patch = Row::new();
                patch.insert("total_price".to_string(), Value::from(expected));
                backend.update(table, &Filter::eq("id", id.clone()), patch).await?;
                report.totals_recomputed.push(render_id(&id));
            }
        }

        let mut active_by_country: BTreeMap<String, Vec<&Row>> = BTreeMap::new();
        for row in &rows {
            if row.get("is_active") != Some(&Value::Bool(true)) {
                continue;
            }
            if let Some(country) = row.get("country_id").and_then(Value::as_str) {
                active_by_country
                    .entry(country.to_string())
                    .or_default()
                    .push(row);
            }
        }

        for (country, mut active) in active_by_country {
            if active.len() < 2 {
                continue;
            }
            active.sort_by(|a, b| compare_values(b.get("updated_at"), a.get("updated_at")));
            for surplus in active.into_iter().skip(1) {
                let Some(id) = surplus.get("id").cloned() else {
                    continue;
                };
                let mut patch = Row::new();
                patch.insert("is_active".to_string(), Value::Bool(false));
                backend.update(table, &Filter::eq("id", id.clone()), patch).await?;
                warn!(%country, id = %render_id(&id), "deactivated duplicate active package");
                report.packages_deactivated.push(render_id(&id));
            }
        }

        self.catalog
            .invalidate(Mutation::new(ResourceKind::VisaPackages, None));
        info!(
            totals = report.totals_recomputed.len(),
            deactivated = report.packages_deactivated.len(),
            "package repair finished"
        );
        Ok(report)
    }
}

fn fee(row: &Row, column: &str) -> f64 {
    row.get(column).and_then(Value::as_f64).unwrap_or_default()
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Accepts `["a", ...]`, `[{"column_name": "a"}, ...]` or `[{"name": "a"}, ...]`.
fn column_names(value: &Value) -> Vec<String> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => fields
                .get("column_name")
                .or_else(|| fields.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}
