
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{InMemoryBackend, Row};
use crate::local_store::LocalStore;
use crate::workflows::catalog::{CatalogService, CountryDraft, QueryCache};

const MOROCCO: Uuid = Uuid::from_u128(0xca7a_0000_0000_0000_0000_0000_0000_0001);
const VIETNAM: Uuid = Uuid::from_u128(0xca7a_0000_0000_0000_0000_0000_0000_0002);
const MOROCCO_ACTIVE: Uuid = Uuid::from_u128(0xca7a_0000_0000_0000_0000_0000_0000_0011);
const MOROCCO_LEGACY: Uuid = Uuid::from_u128(0xca7a_0000_0000_0000_0000_0000_0000_0012);

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object literal")
}

fn seeded_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed(
        "countries",
        vec![
            row(json!({ "id": MOROCCO, "name": "Morocco", "flag": "🇲🇦", "banner": "ma.jpg",
                        "description": "Souks and the Sahara", "is_popular": true })),
            row(json!({ "id": VIETNAM, "name": "Vietnam", "flag": "🇻🇳", "banner": "vn.jpg",
                        "description": "Ha Long Bay", "is_popular": false })),
        ],
    );
    backend.seed(
        "visa_packages",
        vec![
            row(json!({ "id": MOROCCO_ACTIVE, "country_id": MOROCCO, "name": "Standard Visa",
                        "government_fee": 70.0, "service_fee": 30.0, "processing_days": 8,
                        "total_price": 100.0, "is_active": true })),
            row(json!({ "id": MOROCCO_LEGACY, "country_id": MOROCCO, "name": "Old Visa",
                        "government_fee": 50.0, "service_fee": 20.0, "processing_days": 12,
                        "total_price": 70.0, "is_active": false })),
            row(json!({ "country_id": VIETNAM, "name": "Standard Visa",
                        "government_fee": 25.0, "service_fee": 20.0, "processing_days": 5,
                        "total_price": 45.0, "is_active": true })),
        ],
    );
    backend.seed(
        "document_checklist",
        vec![row(json!({ "country_id": MOROCCO, "document_name": "Passport scan" }))],
    );
    backend
}

fn build_service(backend: Arc<InMemoryBackend>) -> CatalogService<InMemoryBackend> {
    CatalogService::new(
        backend,
        Arc::new(QueryCache::new(Duration::from_secs(60))),
        Arc::new(LocalStore::in_memory()),
    )
}

fn country_draft(name: &str) -> CountryDraft {
    CountryDraft {
        name: name.to_string(),
        flag: "🏳️".to_string(),
        banner: format!("https://cdn.example.test/{}.jpg", name.to_lowercase()),
        description: format!("All about {name}"),
        entry_requirements: None,
        is_popular: false,
    }
}
