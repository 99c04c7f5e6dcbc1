use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;
use visa_portal::backend::{DatabaseBackend, InMemoryBackend, RestBackend};
use visa_portal::config::{AppConfig, StorageConfig};
use visa_portal::error::AppError;
use visa_portal::local_store::LocalStore;
use visa_portal::workflows::applications::{ApplicationService, DEFAULT_MAX_DRAFTS};
use visa_portal::workflows::browse::BrowseService;
use visa_portal::workflows::catalog::{CatalogImporter, CatalogService, QueryCache};
use visa_portal::workflows::pricing::{PricingReconciler, SchemaDoctor};

pub(crate) type Backend = dyn DatabaseBackend;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every workflow service, sharing one backend, cache and mock store.
pub(crate) struct Services {
    pub(crate) catalog: Arc<CatalogService<Backend>>,
    pub(crate) reconciler: Arc<PricingReconciler<Backend>>,
    pub(crate) doctor: Arc<SchemaDoctor<Backend>>,
    pub(crate) applications: Arc<ApplicationService<Backend>>,
    pub(crate) browse: Arc<BrowseService<Backend>>,
}

impl Services {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let backend: Arc<Backend> = match &config.backend.remote {
            Some(remote) => Arc::new(RestBackend::new(remote, config.backend.timeout)?),
            None => {
                warn!("APP_BACKEND_URL is not set; serving from the in-process memory backend");
                Arc::new(InMemoryBackend::new())
            }
        };
        let store = match &config.storage.mock_store_path {
            Some(path) => LocalStore::open(path.clone())?,
            None => LocalStore::in_memory(),
        };

        Ok(Self::new(backend, store, &config.storage))
    }

    pub(crate) fn new(
        backend: Arc<Backend>,
        store: LocalStore,
        storage: &StorageConfig,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(
            backend,
            Arc::new(QueryCache::new(storage.cache_ttl)),
            Arc::new(store),
        ));
        let reconciler = Arc::new(PricingReconciler::new(
            catalog.clone(),
            storage.mock_fallback,
        ));
        Self {
            doctor: Arc::new(SchemaDoctor::new(catalog.clone())),
            applications: Arc::new(ApplicationService::with_draft_limits(
                catalog.clone(),
                storage.draft_ttl,
                DEFAULT_MAX_DRAFTS,
            )),
            browse: Arc::new(BrowseService::new(catalog.clone())),
            reconciler,
            catalog,
        }
    }

    pub(crate) fn importer(&self) -> CatalogImporter<Backend> {
        CatalogImporter::new(self.reconciler.clone())
    }
}
