use crate::cli::ServeArgs;
use crate::infra::{AppState, Services};
use crate::routes::app_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use visa_portal::config::AppConfig;
use visa_portal::error::AppError;
use visa_portal::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = Services::from_config(&config)?;
    for banner in services.catalog.store().banners() {
        warn!(resource = %banner.resource, records = banner.records, "{}", banner.message);
    }

    let app = app_router(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        remote_backend = config.backend.remote.is_some(),
        mock_fallback = config.storage.mock_fallback,
        "visa portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
