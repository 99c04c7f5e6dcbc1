use super::*;

use crate::workflows::catalog::ResourceKind;
use crate::workflows::pricing::ColumnSource;

fn package(id: u128, active: bool, total: Value, updated_at: &str) -> Row {
    row(json!({
        "id": Uuid::from_u128(id),
        "country_id": GEORGIA,
        "government_fee": 40.0,
        "service_fee": 20.0,
        "processing_days": 6,
        "total_price": total,
        "is_active": active,
        "updated_at": updated_at
    }))
}

#[tokio::test]
async fn inspect_prefers_the_column_procedure() {
    let backend = backend();
    backend.register_rpc(
        "get_table_columns",
        Arc::new(
            |_: &RpcArgs, _: &mut MemoryTables| -> Result<Value, BackendError> {
                Ok(json!([{ "column_name": "id" }, { "column_name": "name" }]))
            },
        ),
    );
    let reconciler = reconciler(backend, true);

    let schema = doctor(&reconciler)
        .inspect(ResourceKind::Countries)
        .await
        .expect("inspect succeeds");
    assert_eq!(schema.source, ColumnSource::Procedure);
    assert_eq!(schema.columns, vec!["id", "name"]);
}

#[tokio::test]
async fn inspect_samples_a_row_without_the_procedure() {
    let reconciler = reconciler(backend(), true);
    let doctor = doctor(&reconciler);

    let countries = doctor
        .inspect(ResourceKind::Countries)
        .await
        .expect("inspect succeeds");
    assert_eq!(countries.source, ColumnSource::SampleRow);
    assert!(countries.columns.contains(&"banner".to_string()));

    let tiers = doctor
        .inspect(ResourceKind::PricingTiers)
        .await
        .expect("inspect succeeds");
    assert_eq!(tiers.source, ColumnSource::Unknown);
    assert!(tiers.columns.is_empty());
}

#[tokio::test]
async fn refresh_forgets_remembered_columns() {
    let backend = backend();
    backend.register_rpc(
        "refresh_schema_cache",
        Arc::new(|_: &RpcArgs, _: &mut MemoryTables| -> Result<Value, BackendError> {
            Ok(Value::Null)
        }),
    );
    let reconciler = reconciler(backend, true);
    let store = reconciler.catalog().store();
    store
        .remember_missing_column("visa_packages", "total_price")
        .expect("remembered");

    doctor(&reconciler).refresh().await.expect("refresh succeeds");
    assert!(store.schema_errors().is_empty());
}

#[tokio::test]
async fn refresh_without_the_procedure_is_a_backend_error() {
    let reconciler = reconciler(backend(), true);
    let error = doctor(&reconciler)
        .refresh()
        .await
        .expect_err("procedure missing");
    assert_eq!(error.status(), axum::http::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn repair_fixes_totals_and_keeps_the_newest_active_package() {
    let backend = backend();
    backend.seed(
        "visa_packages",
        vec![
            package(1, true, json!(60.0), "2026-01-01T00:00:00Z"),
            package(2, true, json!(99.0), "2026-03-01T00:00:00Z"),
            package(3, false, json!("sixty"), "2026-02-01T00:00:00Z"),
        ],
    );
    let reconciler = reconciler(backend.clone(), true);

    let report = doctor(&reconciler).repair().await.expect("repair succeeds");

    let id = |n: u128| Uuid::from_u128(n).to_string();
    assert_eq!(report.totals_recomputed, vec![id(2), id(3)]);
    assert_eq!(report.packages_deactivated, vec![id(1)]);
    assert!(!report.skipped_total_price);

    let rows = backend.rows("visa_packages");
    let active: Vec<&Row> = rows
        .iter()
        .filter(|row| row.get("is_active") == Some(&Value::Bool(true)))
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].get("id"), Some(&json!(id(2))));
    assert!(rows
        .iter()
        .all(|row| row.get("total_price") == Some(&json!(60.0))));
}

#[tokio::test]
async fn repair_skips_totals_when_the_column_is_missing() {
    let backend = backend();
    backend.seed(
        "visa_packages",
        vec![package(1, true, json!(10.0), "2026-01-01T00:00:00Z")],
    );
    let reconciler = reconciler(backend, true);
    reconciler
        .catalog()
        .store()
        .remember_missing_column("visa_packages", "total_price")
        .expect("remembered");

    let report = doctor(&reconciler).repair().await.expect("repair succeeds");
    assert!(report.skipped_total_price);
    assert!(report.totals_recomputed.is_empty());
}
