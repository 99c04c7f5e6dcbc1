
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{InMemoryBackend, Row};
use crate::local_store::LocalStore;
use crate::workflows::browse::BrowseService;
use crate::workflows::catalog::{CatalogService, QueryCache};

const PERU: Uuid = Uuid::from_u128(0xb0b0_0000_0000_0000_0000_0000_0000_0001);
const KENYA: Uuid = Uuid::from_u128(0xb0b0_0000_0000_0000_0000_0000_0000_0002);

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object literal")
}

fn seeded_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed(
        "countries",
        vec![
            row(json!({ "id": PERU, "name": "Peru", "flag": "🇵🇪", "banner": "pe.jpg",
                        "description": "Machu Picchu and the Andes", "is_popular": true })),
            row(json!({ "id": KENYA, "name": "Kenya", "flag": "🇰🇪", "banner": "ke.jpg",
                        "description": "Safari in the Maasai Mara", "is_popular": false })),
        ],
    );
    backend.seed(
        "visa_packages",
        vec![
            row(json!({ "country_id": PERU, "government_fee": 20.0, "service_fee": 30.0,
                        "processing_days": 3, "total_price": 50.0, "is_active": true })),
            row(json!({ "country_id": KENYA, "government_fee": 51.0, "service_fee": 30.0,
                        "processing_days": 6, "total_price": 81.0, "is_active": false })),
        ],
    );
    backend.seed(
        "visa_types",
        vec![
            row(json!({ "country_id": PERU, "name": "Tourist", "validity_days": 183,
                        "max_stay_days": 90, "entry_type": "single", "is_active": true })),
            row(json!({ "country_id": KENYA, "name": "Business", "validity_days": 90,
                        "max_stay_days": 90, "entry_type": "single", "is_active": true })),
        ],
    );
    backend.seed(
        "document_checklist",
        vec![
            row(json!({ "country_id": PERU, "document_name": "Photo", "sort_order": 2 })),
            row(json!({ "country_id": PERU, "document_name": "Passport scan", "sort_order": 1 })),
        ],
    );
    backend
}

fn build_service(
    backend: Arc<InMemoryBackend>,
) -> (BrowseService<InMemoryBackend>, Arc<CatalogService<InMemoryBackend>>) {
    let catalog = Arc::new(CatalogService::new(
        backend,
        Arc::new(QueryCache::new(Duration::from_secs(60))),
        Arc::new(LocalStore::in_memory()),
    ));
    (BrowseService::new(catalog.clone()), catalog)
}
