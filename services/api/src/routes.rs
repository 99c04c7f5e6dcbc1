use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use visa_portal::workflows::applications::application_router;
use visa_portal::workflows::browse::browse_router;
use visa_portal::workflows::catalog::catalog_router;
use visa_portal::workflows::pricing::pricing_router;

/// Public pages, the wizard, the admin console, plus health and readiness checks.
pub(crate) fn app_router(services: &Services) -> Router {
    browse_router(services.browse.clone())
        .merge(application_router(services.applications.clone()))
        .merge(catalog_router(services.catalog.clone()))
        .merge(pricing_router(
            services.reconciler.clone(),
            services.doctor.clone(),
        ))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;
    use visa_portal::backend::InMemoryBackend;
    use visa_portal::config::StorageConfig;
    use visa_portal::local_store::LocalStore;

    fn test_app() -> (Router, Arc<AtomicBool>) {
        let services = Services::new(
            Arc::new(InMemoryBackend::new()),
            LocalStore::in_memory(),
            &StorageConfig::default(),
        );
        let readiness = Arc::new(AtomicBool::new(false));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        (app_router(&services).layer(Extension(state)), readiness)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .expect("body readable");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn readiness_flips_once_the_listener_is_bound() {
        let (app, readiness) = test_app();
        let (status, body) = get_json(&app, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        readiness.store(true, Ordering::Release);
        let (status, _) = get_json(&app, "/ready").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn every_workflow_is_mounted() {
        let (app, _) = test_app();

        let (status, countries) = get_json(&app, "/api/v1/countries").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(countries["source"], "sample");

        let (status, admin) = get_json(&app, "/api/v1/admin/countries").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(admin, json!([]));

        let (status, mock) = get_json(&app, "/api/v1/admin/mock-mode").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mock["resources"], json!([]));

        let missing = uuid::Uuid::new_v4();
        let (status, _) = get_json(&app, &format!("/api/v1/applications/{missing}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
