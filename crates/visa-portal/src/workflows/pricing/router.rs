use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::chain::{PackagePricing, PricingReconciler};
use super::schema::SchemaDoctor;
use crate::backend::DatabaseBackend;
use crate::workflows::catalog::{Mutation, PricingTierDraft, ResourceKind};

pub struct PricingState<B: ?Sized> {
    pub reconciler: Arc<PricingReconciler<B>>,
    pub doctor: Arc<SchemaDoctor<B>>,
}

impl<B: ?Sized> Clone for PricingState<B> {
    fn clone(&self) -> Self {
        Self {
            reconciler: Arc::clone(&self.reconciler),
            doctor: Arc::clone(&self.doctor),
        }
    }
}

/// Pricing chain, mock-mode, and schema maintenance endpoints.
pub fn pricing_router<B>(
    reconciler: Arc<PricingReconciler<B>>,
    doctor: Arc<SchemaDoctor<B>>,
) -> Router
where
    B: DatabaseBackend + ?Sized + 'static,
{
    Router::new()
        .route(
            "/api/v1/admin/countries/:id/pricing",
            get(pricing_handler::<B>).put(save_pricing_handler::<B>),
        )
        .route(
            "/api/v1/admin/pricing-tiers/:id/reconcile",
            put(save_tier_handler::<B>),
        )
        .route("/api/v1/admin/mock-mode", get(mock_mode_handler::<B>))
        .route(
            "/api/v1/admin/mock-mode/:resource",
            delete(exit_mock_mode_handler::<B>),
        )
        .route("/api/v1/admin/schema/refresh", post(refresh_handler::<B>))
        .route("/api/v1/admin/schema/repair", post(repair_handler::<B>))
        .route("/api/v1/admin/schema/:table", get(inspect_handler::<B>))
        .with_state(PricingState { reconciler, doctor })
}

fn unknown_resource(name: &str) -> Response {
    let payload = json!({ "error": format!("unknown resource '{name}'") });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

pub(crate) async fn pricing_handler<B>(
    State(state): State<PricingState<B>>,
    Path(country_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let mock_mode = state
        .reconciler
        .catalog()
        .store()
        .is_mock(ResourceKind::VisaPackages);
    match state.reconciler.package_for_country(country_id).await {
        Ok(package) => {
            let payload = json!({
                "country_id": country_id,
                "package": package,
                "mock_mode": mock_mode,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn save_pricing_handler<B>(
    State(state): State<PricingState<B>>,
    Path(country_id): Path<Uuid>,
    Json(pricing): Json<PackagePricing>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match state.reconciler.save_package(country_id, pricing).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn save_tier_handler<B>(
    State(state): State<PricingState<B>>,
    Path(tier_id): Path<Uuid>,
    Json(draft): Json<PricingTierDraft>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match state.reconciler.save_tier(Some(tier_id), draft).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn mock_mode_handler<B>(State(state): State<PricingState<B>>) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let store = state.reconciler.catalog().store();
    let payload = json!({
        "resources": store.mock_resources(),
        "banners": store.banners(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn exit_mock_mode_handler<B>(
    State(state): State<PricingState<B>>,
    Path(resource): Path<String>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let Some(kind) = ResourceKind::parse(&resource) else {
        return unknown_resource(&resource);
    };
    let catalog = state.reconciler.catalog();
    match catalog.store().exit_mock_mode(kind) {
        Ok(exited) => {
            catalog.invalidate(Mutation::new(kind, None));
            let payload = json!({ "resource": kind, "exited": exited });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn inspect_handler<B>(
    State(state): State<PricingState<B>>,
    Path(table): Path<String>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let Some(kind) = ResourceKind::parse(&table) else {
        return unknown_resource(&table);
    };
    match state.doctor.inspect(kind).await {
        Ok(schema) => (StatusCode::OK, Json(schema)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn refresh_handler<B>(State(state): State<PricingState<B>>) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match state.doctor.refresh().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "refreshed": true }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn repair_handler<B>(State(state): State<PricingState<B>>) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match state.doctor.repair().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error.into_response(),
    }
}
