//! Pricing reconciliation, mock mode, and schema-cache maintenance.

pub mod chain;
pub mod router;
pub mod schema;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::backend::BackendError;
use crate::local_store::StoreError;
use crate::workflows::catalog::{CatalogError, ValidationError};

pub use chain::{PackagePricing, PricingReconciler, SaveAttempt, SaveOutcome, SaveStrategy};
pub use router::pricing_router;
pub use schema::{ColumnSource, RepairReport, SchemaDoctor, TableSchema};

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("every save strategy failed: {}", describe_attempts(.attempts))]
    Exhausted { attempts: Vec<SaveAttempt> },
}

fn describe_attempts(attempts: &[SaveAttempt]) -> String {
    attempts
        .iter()
        .map(|attempt| format!("{}: {}", attempt.strategy.label(), attempt.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl PricingError {
    pub fn status(&self) -> StatusCode {
        match self {
            PricingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PricingError::Catalog(error) => error.status(),
            PricingError::Backend(BackendError::NotFound { .. }) => StatusCode::NOT_FOUND,
            PricingError::Backend(_) | PricingError::Exhausted { .. } => StatusCode::BAD_GATEWAY,
            PricingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let payload = match &self {
            PricingError::Exhausted { attempts } => json!({
                "error": self.to_string(),
                "attempts": attempts,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, axum::Json(payload)).into_response()
    }
}
