use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{InMemoryBackend, Row};
use crate::local_store::LocalStore;
use crate::workflows::applications::{
    ApplicationService, DocumentUpload, PassportInfo, PersonalInfo, SectionUpdate, TravelInfo,
};
use crate::workflows::catalog::{CatalogService, QueryCache};

pub(super) const JAPAN: Uuid = Uuid::from_u128(0x1a9a_0000_0000_0000_0000_0000_0000_0001);
pub(super) const FRANCE: Uuid = Uuid::from_u128(0x1a9a_0000_0000_0000_0000_0000_0000_0002);
pub(super) const JAPAN_PACKAGE: Uuid = Uuid::from_u128(0x1a9a_0000_0000_0000_0000_0000_0000_0011);
pub(super) const FRANCE_PACKAGE: Uuid = Uuid::from_u128(0x1a9a_0000_0000_0000_0000_0000_0000_0012);
pub(super) const FAST_TRACK: Uuid = Uuid::from_u128(0x1a9a_0000_0000_0000_0000_0000_0000_0021);

pub(super) fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object literal")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Two countries with one active package each, a required checklist item for Japan and one addon.
pub(super) fn seeded_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed(
        "countries",
        vec![
            row(json!({ "id": JAPAN, "name": "Japan", "flag": "🇯🇵", "banner": "jp.jpg", "description": "Islands" })),
            row(json!({ "id": FRANCE, "name": "France", "flag": "🇫🇷", "banner": "fr.jpg", "description": "Wine" })),
        ],
    );
    backend.seed(
        "visa_packages",
        vec![
            row(json!({
                "id": JAPAN_PACKAGE, "country_id": JAPAN, "name": "Standard Visa",
                "government_fee": 60.0, "service_fee": 40.0, "processing_days": 7,
                "total_price": 100.0, "is_active": true
            })),
            row(json!({
                "id": FRANCE_PACKAGE, "country_id": FRANCE, "name": "Standard Visa",
                "government_fee": 80.0, "service_fee": 35.0, "processing_days": 10,
                "total_price": 115.0, "is_active": true
            })),
        ],
    );
    backend.seed(
        "document_checklist",
        vec![row(json!({
            "country_id": JAPAN, "document_name": "Passport scan", "is_required": true, "sort_order": 1
        }))],
    );
    backend.seed(
        "addon_services",
        vec![row(json!({ "id": FAST_TRACK, "name": "Fast track", "price": 25.0, "is_active": true }))],
    );
    backend
}

fn catalog_for(backend: Arc<InMemoryBackend>) -> Arc<CatalogService<InMemoryBackend>> {
    Arc::new(CatalogService::new(
        backend,
        Arc::new(QueryCache::new(Duration::from_secs(60))),
        Arc::new(LocalStore::in_memory()),
    ))
}

pub(super) fn build_service() -> (ApplicationService<InMemoryBackend>, Arc<InMemoryBackend>) {
    let backend = seeded_backend();
    (ApplicationService::new(catalog_for(backend.clone())), backend)
}

pub(super) fn build_service_with_limits(
    draft_ttl: Duration,
    max_drafts: usize,
) -> ApplicationService<InMemoryBackend> {
    ApplicationService::with_draft_limits(catalog_for(seeded_backend()), draft_ttl, max_drafts)
}

pub(super) fn personal() -> SectionUpdate {
    SectionUpdate::Personal(PersonalInfo {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.test".to_string(),
        ..PersonalInfo::default()
    })
}

pub(super) fn travel(country_id: Uuid, package_id: Option<Uuid>, addon_ids: Vec<Uuid>) -> SectionUpdate {
    SectionUpdate::Travel(TravelInfo {
        country_id: Some(country_id),
        package_id,
        purpose: Some("tourism".to_string()),
        arrival_date: Some(date(2027, 4, 1)),
        departure_date: Some(date(2027, 4, 14)),
        addon_ids,
    })
}

pub(super) fn passport() -> SectionUpdate {
    SectionUpdate::Passport(PassportInfo {
        passport_number: "LA1815".to_string(),
        issuing_country: "GB".to_string(),
        issue_date: Some(date(2022, 1, 10)),
        expiry_date: Some(date(2032, 1, 9)),
    })
}

pub(super) fn documents(names: &[&str]) -> SectionUpdate {
    SectionUpdate::Documents(
        names
            .iter()
            .map(|name| DocumentUpload {
                document_name: name.to_string(),
                file_name: format!("{}.pdf", name.to_ascii_lowercase().replace(' ', "-")),
                size_bytes: 48_000,
                content_type: None,
            })
            .collect(),
    )
}

/// Walk a draft through every step up to review.
pub(super) fn complete_draft<B>(
    service: &ApplicationService<B>,
    sections: Vec<SectionUpdate>,
) -> Uuid
where
    B: crate::backend::DatabaseBackend + ?Sized + 'static,
{
    let draft = service.start(Default::default());
    for section in sections {
        service.update(draft.id, section).expect("section applies");
        service.advance(draft.id).expect("step validates");
    }
    draft.id
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
