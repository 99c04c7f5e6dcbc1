use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::domain::{
    AddonService, Country, DocumentChecklistItem, PricingTier, VisaPackage, VisaType,
};
use super::resource::Resource;
use super::service::CatalogService;
use super::table::{CountryColumn, SortDirection, SortState};
use crate::backend::DatabaseBackend;

type CatalogState<B> = Arc<CatalogService<B>>;

/// Admin CRUD endpoints for every catalog table under `/api/v1/admin`.
pub fn catalog_router<B>(service: Arc<CatalogService<B>>) -> Router
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let router = Router::new();
    let router = resource_routes::<Country, B>(router, get(admin_countries_handler::<B>));
    let router = resource_routes::<VisaPackage, B>(router, get(list_handler::<VisaPackage, B>));
    let router = resource_routes::<VisaType, B>(router, get(list_handler::<VisaType, B>));
    let router = resource_routes::<AddonService, B>(router, get(list_handler::<AddonService, B>));
    let router = resource_routes::<DocumentChecklistItem, B>(
        router,
        get(list_handler::<DocumentChecklistItem, B>),
    );
    let router = resource_routes::<PricingTier, B>(router, get(list_handler::<PricingTier, B>));

    router
        .route(
            "/api/v1/admin/visa-packages/:id/active",
            patch(package_active_handler::<B>),
        )
        .with_state(service)
}

fn resource_routes<R, B>(
    router: Router<CatalogState<B>>,
    list: MethodRouter<CatalogState<B>>,
) -> Router<CatalogState<B>>
where
    R: Resource,
    B: DatabaseBackend + ?Sized + 'static,
{
    let base = format!("/api/v1/admin/{}", R::KIND.slug());
    router
        .route(&base, list.post(create_handler::<R, B>))
        .route(
            &format!("{base}/:id"),
            get(get_handler::<R, B>)
                .put(update_handler::<R, B>)
                .delete(delete_handler::<R, B>),
        )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AdminCountriesParams {
    sort: Option<CountryColumn>,
    direction: Option<SortDirection>,
}

pub(crate) async fn admin_countries_handler<B>(
    State(service): State<CatalogState<B>>,
    Query(params): Query<AdminCountriesParams>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    let sort = SortState::new(
        params.sort.unwrap_or_default(),
        params.direction.unwrap_or_default(),
    );
    match service.admin_countries(sort).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_handler<R, B>(State(service): State<CatalogState<B>>) -> Response
where
    R: Resource,
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.list::<R>().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn get_handler<R, B>(
    State(service): State<CatalogState<B>>,
    Path(id): Path<Uuid>,
) -> Response
where
    R: Resource,
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.get::<R>(id).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn create_handler<R, B>(
    State(service): State<CatalogState<B>>,
    Json(draft): Json<R::Draft>,
) -> Response
where
    R: Resource,
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.create::<R>(draft).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_handler<R, B>(
    State(service): State<CatalogState<B>>,
    Path(id): Path<Uuid>,
    Json(draft): Json<R::Draft>,
) -> Response
where
    R: Resource,
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.update::<R>(id, draft).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_handler<R, B>(
    State(service): State<CatalogState<B>>,
    Path(id): Path<Uuid>,
) -> Response
where
    R: Resource,
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.delete::<R>(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivationPayload {
    is_active: bool,
}

pub(crate) async fn package_active_handler<B>(
    State(service): State<CatalogState<B>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActivationPayload>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.set_package_active(id, payload.is_active).await {
        Ok(package) => (StatusCode::OK, Json(package)).into_response(),
        Err(error) => error.into_response(),
    }
}
