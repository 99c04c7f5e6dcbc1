mod chain;
mod schema;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{
    BackendError, BackendOperation, InMemoryBackend, MemoryTables, Row, RpcArgs,
};
use crate::local_store::LocalStore;
use crate::workflows::catalog::{CatalogService, QueryCache};
use crate::workflows::pricing::{PackagePricing, PricingReconciler, SchemaDoctor};

const GEORGIA: Uuid = Uuid::from_u128(0x9e09_0000_0000_0000_0000_0000_0000_0001);

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object literal")
}

fn backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed(
        "countries",
        vec![row(json!({ "id": GEORGIA, "name": "Georgia", "flag": "🇬🇪",
                         "banner": "ge.jpg", "description": "Caucasus wine country" }))],
    );
    backend
}

fn reconciler(backend: Arc<InMemoryBackend>, mock_fallback: bool) -> PricingReconciler<InMemoryBackend> {
    let catalog = Arc::new(CatalogService::new(
        backend,
        Arc::new(QueryCache::new(Duration::from_secs(60))),
        Arc::new(LocalStore::in_memory()),
    ));
    PricingReconciler::new(catalog, mock_fallback)
}

fn doctor(reconciler: &PricingReconciler<InMemoryBackend>) -> SchemaDoctor<InMemoryBackend> {
    SchemaDoctor::new(reconciler.catalog().clone())
}

fn pricing(government_fee: f64, service_fee: f64, processing_days: i32) -> PackagePricing {
    PackagePricing {
        name: "Standard Visa".to_string(),
        government_fee,
        service_fee,
        processing_days,
        is_active: true,
    }
}

/// Every table write for `visa_packages` fails, as during an outage of the REST layer.
fn break_package_table(backend: &InMemoryBackend) {
    for operation in [
        BackendOperation::Select,
        BackendOperation::Insert,
        BackendOperation::Update,
    ] {
        backend.fail("visa_packages", operation);
    }
}

/// A `save_visa_package` procedure that only understands named arguments when `named` is set.
fn install_save_procedure(backend: &InMemoryBackend, named: bool) {
    backend.register_rpc(
        "save_visa_package",
        Arc::new(move |args: &RpcArgs, tables: &mut MemoryTables| {
            let fields = match (args, named) {
                (RpcArgs::Named(fields), true) => [
                    fields.get("p_country_id").cloned(),
                    fields.get("p_government_fee").cloned(),
                    fields.get("p_service_fee").cloned(),
                    fields.get("p_processing_days").cloned(),
                ],
                (RpcArgs::Positional(values), false) => [
                    values.first().cloned(),
                    values.get(2).cloned(),
                    values.get(3).cloned(),
                    values.get(4).cloned(),
                ],
                _ => {
                    return Err(BackendError::Api {
                        status: 400,
                        code: Some("PGRST203".to_string()),
                        message: "could not choose the best candidate function".to_string(),
                    })
                }
            };
            let [country_id, government_fee, service_fee, processing_days] =
                fields.map(|field| field.unwrap_or(Value::Null));
            let saved = row(json!({
                "id": Uuid::new_v4(),
                "country_id": country_id,
                "name": "Standard Visa",
                "government_fee": government_fee,
                "service_fee": service_fee,
                "processing_days": processing_days,
                "is_active": true
            }));
            tables
                .entry("visa_packages".to_string())
                .or_default()
                .push(saved.clone());
            Ok(Value::Array(vec![Value::Object(saved)]))
        }),
    );
}
