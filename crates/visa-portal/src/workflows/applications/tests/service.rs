use std::time::Duration;

use super::common::*;

use crate::backend::{BackendOperation, Row};
use crate::workflows::applications::{
    ApplicationStatus, StartDraft, WizardError, WizardStep, WizardStepError,
};
use crate::workflows::catalog::ValidationError;

#[tokio::test]
async fn submit_prices_the_active_package_and_addons() {
    let (service, backend) = build_service();
    let draft_id = complete_draft(
        &service,
        vec![
            personal(),
            travel(JAPAN, None, vec![FAST_TRACK]),
            passport(),
            documents(&["Passport scan"]),
        ],
    );

    let application = service.submit(draft_id).await.expect("submission succeeds");

    assert_eq!(application.country_id, JAPAN);
    assert_eq!(application.package_id, Some(JAPAN_PACKAGE));
    assert_eq!(application.total_amount, 125.0);
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert!(application.reference_number.starts_with("VISA-"));
    assert_eq!(
        application.documents[0].content_type.as_deref(),
        Some("application/pdf")
    );

    let stored: Vec<Row> = backend.rows("visa_applications");
    assert_eq!(stored.len(), 1, "exactly one row per submission");
    assert!(matches!(
        service.draft(draft_id),
        Err(WizardError::DraftNotFound(_))
    ));

    let fetched = service
        .application(application.id)
        .await
        .expect("application is readable");
    assert_eq!(fetched.reference_number, application.reference_number);
}

#[tokio::test]
async fn submit_rejects_a_package_from_another_country() {
    let (service, backend) = build_service();
    let draft_id = complete_draft(
        &service,
        vec![
            personal(),
            travel(JAPAN, Some(FRANCE_PACKAGE), Vec::new()),
            passport(),
            documents(&["Passport scan"]),
        ],
    );

    let error = service.submit(draft_id).await.expect_err("package mismatch");
    assert_eq!(error.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    assert!(backend.rows("visa_applications").is_empty());
    assert!(service.draft(draft_id).is_ok(), "draft survives a failed submit");
}

#[tokio::test]
async fn submit_requires_every_required_checklist_document() {
    let (service, _) = build_service();
    let draft_id = complete_draft(
        &service,
        vec![
            personal(),
            travel(JAPAN, None, Vec::new()),
            passport(),
            documents(&["Bank statement"]),
        ],
    );

    let error = service.submit(draft_id).await.expect_err("checklist item missing");
    assert!(matches!(
        error,
        WizardError::Step(WizardStepError::Validation(ValidationError::Invalid {
            field: "documents",
            ref reason,
        })) if reason.contains("Passport scan")
    ));
}

#[tokio::test]
async fn submit_is_refused_before_the_review_step() {
    let (service, backend) = build_service();
    let draft = service.start(StartDraft {
        country_id: Some(FRANCE),
        package_id: None,
    });
    service.update(draft.id, personal()).expect("section applies");

    let error = service.submit(draft.id).await.expect_err("not at review");
    assert_eq!(error.current_step(), Some(WizardStep::PersonalInfo));
    assert_eq!(error.status(), axum::http::StatusCode::CONFLICT);
    assert!(backend
        .calls()
        .iter()
        .all(|call| call.operation != BackendOperation::Insert));
}

#[tokio::test]
async fn failed_inserts_surface_as_backend_errors() {
    let (service, backend) = build_service();
    let draft_id = complete_draft(
        &service,
        vec![
            personal(),
            travel(FRANCE, None, Vec::new()),
            passport(),
            documents(&["Photo"]),
        ],
    );
    backend.fail("visa_applications", BackendOperation::Insert);

    let error = service.submit(draft_id).await.expect_err("insert fails");
    assert!(matches!(error, WizardError::Backend(_)));
    assert_eq!(error.status(), axum::http::StatusCode::BAD_GATEWAY);
    assert!(service.draft(draft_id).is_ok(), "draft is kept for a retry");
}

#[tokio::test]
async fn concurrent_submits_of_one_draft_store_a_single_row() {
    let (service, backend) = build_service();
    let draft_id = complete_draft(
        &service,
        vec![
            personal(),
            travel(JAPAN, None, vec![FAST_TRACK]),
            passport(),
            documents(&["Passport scan"]),
        ],
    );

    let (first, second) = tokio::join!(service.submit(draft_id), service.submit(draft_id));

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(WizardError::DraftNotFound(id)) if *id == draft_id)));
    assert_eq!(backend.rows("visa_applications").len(), 1);
}

#[test]
fn drafts_past_their_ttl_are_gone() {
    let service = build_service_with_limits(Duration::ZERO, 10);
    let draft = service.start(StartDraft::default());

    assert!(matches!(
        service.draft(draft.id),
        Err(WizardError::DraftNotFound(id)) if id == draft.id
    ));
    assert!(matches!(
        service.update(draft.id, personal()),
        Err(WizardError::DraftNotFound(_))
    ));
}

#[test]
fn starting_past_the_cap_evicts_the_least_recently_updated_draft() {
    let service = build_service_with_limits(Duration::from_secs(3600), 2);
    let oldest = service.start(StartDraft::default());
    let touched = service.start(StartDraft::default());
    service.update(touched.id, personal()).expect("section applies");

    let newest = service.start(StartDraft::default());

    assert!(matches!(
        service.draft(oldest.id),
        Err(WizardError::DraftNotFound(_))
    ));
    assert!(service.draft(touched.id).is_ok());
    assert!(service.draft(newest.id).is_ok());
}

#[test]
fn start_preselects_destination() {
    let (service, _) = build_service();
    let draft = service.start(StartDraft {
        country_id: Some(JAPAN),
        package_id: Some(JAPAN_PACKAGE),
    });
    assert_eq!(draft.step, WizardStep::PersonalInfo);
    assert_eq!(draft.travel.country_id, Some(JAPAN));
    assert_eq!(draft.travel.package_id, Some(JAPAN_PACKAGE));
}
