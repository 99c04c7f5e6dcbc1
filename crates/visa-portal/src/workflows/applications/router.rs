use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::service::{ApplicationService, DraftView, StartDraft};
use super::wizard::SectionUpdate;
use crate::backend::DatabaseBackend;

type WizardState<B> = Arc<ApplicationService<B>>;

/// Wizard draft endpoints plus the submitted-application lookup.
pub fn application_router<B>(service: Arc<ApplicationService<B>>) -> Router
where
    B: DatabaseBackend + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/applications/drafts", post(start_handler::<B>))
        .route(
            "/api/v1/applications/drafts/:draft_id",
            get(draft_handler::<B>).patch(update_handler::<B>),
        )
        .route(
            "/api/v1/applications/drafts/:draft_id/advance",
            post(advance_handler::<B>),
        )
        .route(
            "/api/v1/applications/drafts/:draft_id/back",
            post(back_handler::<B>),
        )
        .route(
            "/api/v1/applications/drafts/:draft_id/submit",
            post(submit_handler::<B>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<B>),
        )
        .with_state(service)
}

pub(crate) async fn start_handler<B>(
    State(service): State<WizardState<B>>,
    Json(start): Json<StartDraft>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let draft = service.start(start);
    (StatusCode::CREATED, Json(DraftView::from(draft))).into_response()
}

pub(crate) async fn draft_handler<B>(
    State(service): State<WizardState<B>>,
    Path(draft_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.draft(draft_id) {
        Ok(draft) => (StatusCode::OK, Json(DraftView::from(draft))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_handler<B>(
    State(service): State<WizardState<B>>,
    Path(draft_id): Path<Uuid>,
    Json(update): Json<SectionUpdate>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.update(draft_id, update) {
        Ok(draft) => (StatusCode::OK, Json(DraftView::from(draft))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn advance_handler<B>(
    State(service): State<WizardState<B>>,
    Path(draft_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.advance(draft_id) {
        Ok(draft) => (StatusCode::OK, Json(DraftView::from(draft))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn back_handler<B>(
    State(service): State<WizardState<B>>,
    Path(draft_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.back(draft_id) {
        Ok(draft) => (StatusCode::OK, Json(DraftView::from(draft))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_handler<B>(
    State(service): State<WizardState<B>>,
    Path(draft_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.submit(draft_id).await {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn application_handler<B>(
    State(service): State<WizardState<B>>,
    Path(application_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.application(application_id).await {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}
