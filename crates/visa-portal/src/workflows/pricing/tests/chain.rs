use super::*;

use crate::workflows::catalog::{PricingTierDraft, ResourceKind, ValidationError};
use crate::workflows::pricing::{PricingError, SaveStrategy};

#[tokio::test]
async fn named_procedure_success_ends_the_chain() {
    let backend = backend();
    install_save_procedure(&backend, true);
    let reconciler = reconciler(backend.clone(), true);

    let outcome = reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect("save succeeds");

    assert_eq!(outcome.strategy, SaveStrategy::NamedRpc);
    assert!(outcome.attempts.is_empty());
    assert_eq!(outcome.record.country_id, GEORGIA);
    assert!(backend
        .calls()
        .iter()
        .all(|call| call.operation == BackendOperation::Rpc));
}

#[tokio::test]
async fn positional_procedure_is_tried_second() {
    let backend = backend();
    install_save_procedure(&backend, false);
    let reconciler = reconciler(backend.clone(), true);

    let outcome = reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect("save succeeds");

    assert_eq!(outcome.strategy, SaveStrategy::PositionalRpc);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.attempts[0].strategy, SaveStrategy::NamedRpc);
    assert_eq!(outcome.record.total(), 60.0);
}

#[tokio::test]
async fn direct_upsert_updates_the_existing_country_package() {
    let backend = backend();
    let reconciler = reconciler(backend.clone(), true);

    let first = reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect("first save");
    assert_eq!(first.strategy, SaveStrategy::DirectUpsert);
    assert_eq!(first.attempts.len(), 2, "both procedure calls failed first");

    let second = reconciler
        .save_package(GEORGIA, pricing(45.0, 20.0, 4))
        .await
        .expect("second save");
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.record.total_price, Some(65.0));
    assert_eq!(backend.rows("visa_packages").len(), 1);
}

#[tokio::test]
async fn missing_columns_are_remembered_and_stripped_afterwards() {
    let backend = backend();
    backend.drop_column("visa_packages", "total_price");
    let reconciler = reconciler(backend.clone(), true);

    let first = reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect("first save");
    assert_eq!(first.strategy, SaveStrategy::SimplifiedWrite);
    assert!(reconciler
        .catalog()
        .store()
        .missing_columns("visa_packages")
        .contains("total_price"));

    backend.clear_calls();
    let second = reconciler
        .save_package(GEORGIA, pricing(50.0, 20.0, 6))
        .await
        .expect("second save");
    assert_eq!(second.strategy, SaveStrategy::DirectUpsert);
    assert_eq!(second.record.total(), 70.0, "total falls back to the fee sum");

    let update = backend
        .calls()
        .into_iter()
        .find(|call| call.operation == BackendOperation::Update)
        .and_then(|call| call.payload)
        .expect("direct upsert updated the row");
    assert!(update.get("total_price").is_none());
    assert_eq!(update.get("name"), Some(&json!("Standard Visa")));
}

#[tokio::test]
async fn exhausted_chain_enters_mock_mode_and_serves_local_reads() {
    let backend = backend();
    break_package_table(&backend);
    let reconciler = reconciler(backend.clone(), true);

    let outcome = reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect("mock store accepts the save");
    assert_eq!(outcome.strategy, SaveStrategy::MockStore);
    let tried: Vec<SaveStrategy> = outcome
        .attempts
        .iter()
        .map(|attempt| attempt.strategy)
        .collect();
    assert_eq!(
        tried,
        vec![
            SaveStrategy::NamedRpc,
            SaveStrategy::PositionalRpc,
            SaveStrategy::DirectUpsert,
            SaveStrategy::SimplifiedWrite,
        ]
    );

    let store = reconciler.catalog().store();
    assert!(store.is_mock(ResourceKind::VisaPackages));
    let banners = store.banners();
    assert_eq!(banners.len(), 1);
    assert!(banners[0].message.contains("Exit mock mode"));

    let shown = reconciler
        .package_for_country(GEORGIA)
        .await
        .expect("read from store")
        .expect("synthetic record");
    assert_eq!(shown.id, outcome.record.id);
    assert_eq!(shown.total(), 60.0);

    backend.clear_calls();
    let again = reconciler
        .save_package(GEORGIA, pricing(42.0, 20.0, 6))
        .await
        .expect("still in mock mode");
    assert_eq!(again.strategy, SaveStrategy::MockStore);
    assert_eq!(again.record.id, outcome.record.id);
    assert!(backend.calls().is_empty(), "mock mode skips the database");
}

#[tokio::test]
async fn mock_mode_stays_on_after_the_database_recovers() {
    let backend = backend();
    break_package_table(&backend);
    let reconciler = reconciler(backend.clone(), true);
    reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect("mock save");

    for operation in [
        BackendOperation::Select,
        BackendOperation::Insert,
        BackendOperation::Update,
    ] {
        backend.recover("visa_packages", operation);
    }
    let outcome = reconciler
        .save_package(GEORGIA, pricing(41.0, 20.0, 6))
        .await
        .expect("save");
    assert_eq!(outcome.strategy, SaveStrategy::MockStore);

    let store = reconciler.catalog().store();
    assert!(store
        .exit_mock_mode(ResourceKind::VisaPackages)
        .expect("exit persists"));
    let outcome = reconciler
        .save_package(GEORGIA, pricing(41.0, 20.0, 6))
        .await
        .expect("save");
    assert_eq!(outcome.strategy, SaveStrategy::DirectUpsert);
}

#[tokio::test]
async fn disabled_fallback_reports_every_attempt() {
    let backend = backend();
    break_package_table(&backend);
    let reconciler = reconciler(backend.clone(), false);

    let error = reconciler
        .save_package(GEORGIA, pricing(40.0, 20.0, 6))
        .await
        .expect_err("no fallback");
    match &error {
        PricingError::Exhausted { attempts } => assert_eq!(attempts.len(), 4),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(error.status(), axum::http::StatusCode::BAD_GATEWAY);
    assert!(!reconciler
        .catalog()
        .store()
        .is_mock(ResourceKind::VisaPackages));
}

#[tokio::test]
async fn invalid_pricing_is_rejected_before_any_call() {
    let backend = backend();
    let reconciler = reconciler(backend.clone(), true);
    backend.clear_calls();

    let error = reconciler
        .save_package(GEORGIA, pricing(40.0, -5.0, 6))
        .await
        .expect_err("negative fee");
    assert!(matches!(
        error,
        PricingError::Validation(ValidationError::Negative {
            field: "service_fee"
        })
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn tier_chain_falls_back_to_a_simplified_write() {
    let backend = backend();
    backend.drop_column("pricing_tiers", "description");
    let reconciler = reconciler(backend.clone(), true);
    let visa_type_id = Uuid::new_v4();

    let outcome = reconciler
        .save_tier(
            None,
            PricingTierDraft {
                visa_type_id,
                name: "Express".to_string(),
                price: 120.0,
                processing_days: 2,
                description: Some("Processed within two days".to_string()),
                is_active: true,
            },
        )
        .await
        .expect("tier saved");

    assert_eq!(outcome.strategy, SaveStrategy::SimplifiedWrite);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.record.description, None);
    assert_eq!(backend.rows("pricing_tiers").len(), 1);
}
