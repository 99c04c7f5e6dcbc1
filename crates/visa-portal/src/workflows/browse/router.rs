use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::filter::{CountryQuery, FinderQuery};
use super::service::BrowseService;
use crate::backend::DatabaseBackend;

pub fn browse_router<B>(service: Arc<BrowseService<B>>) -> Router
where
    B: DatabaseBackend + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/countries", get(countries_handler::<B>))
        .route("/api/v1/countries/popular", get(popular_handler::<B>))
        .route("/api/v1/countries/:country_id", get(country_handler::<B>))
        .route("/api/v1/visa-finder", get(finder_handler::<B>))
        .with_state(service)
}

pub(crate) async fn countries_handler<B>(
    State(service): State<Arc<BrowseService<B>>>,
    Query(query): Query<CountryQuery>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    (StatusCode::OK, Json(service.countries(&query).await)).into_response()
}

pub(crate) async fn popular_handler<B>(State(service): State<Arc<BrowseService<B>>>) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    (StatusCode::OK, Json(service.popular().await)).into_response()
}

pub(crate) async fn country_handler<B>(
    State(service): State<Arc<BrowseService<B>>>,
    Path(country_id): Path<Uuid>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    match service.country(country_id).await {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn finder_handler<B>(
    State(service): State<Arc<BrowseService<B>>>,
    Query(query): Query<FinderQuery>,
) -> Response
where
    B: DatabaseBackend + ?Sized + 'static,
{
    (StatusCode::OK, Json(service.finder(&query).await)).into_response()
}
