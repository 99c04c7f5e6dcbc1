use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::domain::{reference_number, ApplicationStatus, TravelInfo, VisaApplication};
use super::wizard::{ApplicationDraft, SectionUpdate, WizardStep, WizardStepError};
use crate::backend::{decode_row, encode_row, BackendError, DatabaseBackend, Query};
use crate::workflows::catalog::service::active_package_for;
use crate::workflows::catalog::{
    AddonService, CatalogError, CatalogService, DocumentChecklistItem, ResourceKind,
    ValidationError, VisaPackage,
};

/// Optional preselection when a wizard is opened from a country page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartDraft {
    #[serde(default)]
    pub country_id: Option<Uuid>,
    #[serde(default)]
    pub package_id: Option<Uuid>,
}

/// Draft plus what the client needs to render the current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftView {
    #[serde(flatten)]
    pub draft: ApplicationDraft,
    pub step_number: u8,
    pub can_submit: bool,
}

impl From<ApplicationDraft> for DraftView {
    fn from(draft: ApplicationDraft) -> Self {
        Self {
            step_number: draft.step.number(),
            can_submit: draft.ready_for_submit().is_ok(),
            draft,
        }
    }
}

pub const DEFAULT_DRAFT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_DRAFTS: usize = 10_000;

/// Drives wizard drafts and turns a reviewed draft into one `visa_applications` row.
///
/// Drafts untouched for longer than the TTL are dropped, and the least recently
/// updated draft is evicted once `max_drafts` are open.
pub struct ApplicationService<B: ?Sized> {
    catalog: Arc<CatalogService<B>>,
    drafts: Mutex<HashMap<Uuid, ApplicationDraft>>,
    draft_ttl: Duration,
    max_drafts: usize,
}

impl<B> ApplicationService<B>
where
    B: DatabaseBackend + ?Sized + 'static,
{
    pub fn new(catalog: Arc<CatalogService<B>>) -> Self {
        Self::with_draft_limits(catalog, DEFAULT_DRAFT_TTL, DEFAULT_MAX_DRAFTS)
    }

    pub fn with_draft_limits(
        catalog: Arc<CatalogService<B>>,
        draft_ttl: Duration,
        max_drafts: usize,
    ) -> Self {
        Self {
            catalog,
            drafts: Mutex::new(HashMap::new()),
            draft_ttl,
            max_drafts: max_drafts.max(1),
        }
    }

    /// Locks the draft map with expired drafts already dropped.
    fn drafts(&self) -> MutexGuard<'_, HashMap<Uuid, ApplicationDraft>> {
        let mut drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        let before = drafts.len();
        drafts.retain(|_, draft| !self.is_expired(draft));
        if drafts.len() < before {
            debug!(expired = before - drafts.len(), "dropped stale application drafts");
        }
        drafts
    }

    fn is_expired(&self, draft: &ApplicationDraft) -> bool {
        // A clock that moved backwards yields a negative age; keep those drafts.
        Utc::now()
            .signed_duration_since(draft.updated_at)
            .to_std()
            .is_ok_and(|age| age >= self.draft_ttl)
    }

    pub fn start(&self, start: StartDraft) -> ApplicationDraft {
        let draft = ApplicationDraft::new(TravelInfo {
            country_id: start.country_id,
            package_id: start.package_id,
            ..TravelInfo::default()
        });
        let mut drafts = self.drafts();
        while drafts.len() >= self.max_drafts {
            let Some(oldest) = drafts
                .values()
                .min_by_key(|draft| draft.updated_at)
                .map(|draft| draft.id)
            else {
                break;
            };
            drafts.remove(&oldest);
            debug!(draft = %oldest, "evicted least recently updated application draft");
        }
        drafts.insert(draft.id, draft.clone());
        drop(drafts);
        info!(draft = %draft.id, "application draft started");
        draft
    }

    pub fn draft(&self, id: Uuid) -> Result<ApplicationDraft, WizardError> {
        self.drafts()
            .get(&id)
            .cloned()
            .ok_or(WizardError::DraftNotFound(id))
    }

    fn with_draft(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut ApplicationDraft) -> Result<(), WizardError>,
    ) -> Result<ApplicationDraft, WizardError> {
        let mut drafts = self.drafts();
        let draft = drafts.get_mut(&id).ok_or(WizardError::DraftNotFound(id))?;
        change(draft)?;
        Ok(draft.clone())
    }

    pub fn update(&self, id: Uuid, update: SectionUpdate) -> Result<ApplicationDraft, WizardError> {
        self.with_draft(id, |draft| Ok(draft.apply(update)?))
    }

    pub fn advance(&self, id: Uuid) -> Result<ApplicationDraft, WizardError> {
        self.with_draft(id, |draft| {
            draft.advance()?;
            Ok(())
        })
    }

    pub fn back(&self, id: Uuid) -> Result<ApplicationDraft, WizardError> {
        self.with_draft(id, |draft| {
            draft.back();
            Ok(())
        })
    }

    /// Submit a reviewed draft as a single row.
    ///
    /// The draft leaves the map before any backend call, so a concurrent submit
    /// of the same draft sees `DraftNotFound`. It is put back when submission fails.
    pub async fn submit(&self, id: Uuid) -> Result<VisaApplication, WizardError> {
        let draft = {
            let mut drafts = self.drafts();
            let draft = drafts.get(&id).ok_or(WizardError::DraftNotFound(id))?;
            draft.ready_for_submit()?;
            drafts.remove(&id).ok_or(WizardError::DraftNotFound(id))?
        };

        match self.persist(&draft).await {
            Ok(submitted) => Ok(submitted),
            Err(error) => {
                self.drafts().insert(id, draft);
                Err(error)
            }
        }
    }

    async fn persist(&self, draft: &ApplicationDraft) -> Result<VisaApplication, WizardError> {
        let country_id = draft
            .travel
            .country_id
            .ok_or(ValidationError::MissingFields {
                fields: vec!["country_id"],
            })?;

        self.check_required_documents(draft, country_id).await?;
        let package = self.package_for(draft, country_id).await?;
        let mut total_amount = package.as_ref().map_or(0.0, VisaPackage::total);
        for addon_id in &draft.travel.addon_ids {
            let addon: AddonService = self.catalog.get(*addon_id).await?;
            total_amount += addon.price;
        }

        let now = Utc::now();
        let application = VisaApplication {
            id: Uuid::new_v4(),
            reference_number: reference_number(now),
            country_id,
            package_id: package.as_ref().map(|package| package.id),
            first_name: draft.personal.first_name.trim().to_string(),
            last_name: draft.personal.last_name.trim().to_string(),
            email: draft.personal.email.trim().to_string(),
            phone: draft.personal.phone.clone(),
            date_of_birth: draft.personal.date_of_birth,
            nationality: draft.personal.nationality.clone(),
            purpose: draft.travel.purpose.clone(),
            arrival_date: draft.travel.arrival_date,
            departure_date: draft.travel.departure_date,
            passport_number: draft.passport.passport_number.trim().to_string(),
            passport_issuing_country: Some(draft.passport.issuing_country.clone()),
            passport_issue_date: draft.passport.issue_date,
            passport_expiry_date: draft.passport.expiry_date,
            documents: draft.documents.clone(),
            addon_ids: draft.travel.addon_ids.clone(),
            total_amount,
            status: ApplicationStatus::Pending,
            created_at: Some(now),
        };

        let stored = self
            .catalog
            .backend()
            .insert(ResourceKind::VisaApplications.table(), encode_row(&application)?)
            .await?;
        let submitted: VisaApplication = decode_row(stored)?;

        info!(
            reference = %submitted.reference_number,
            %country_id,
            total_amount,
            "visa application submitted"
        );
        Ok(submitted)
    }

    pub async fn application(&self, id: Uuid) -> Result<VisaApplication, WizardError> {
        let rows = self
            .catalog
            .backend()
            .select(
                ResourceKind::VisaApplications.table(),
                &Query::all().eq("id", id.to_string()).limit(1),
            )
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or(WizardError::ApplicationNotFound(id))?;
        Ok(decode_row(row)?)
    }

    /// The selected package, or the country's active package when none was picked.
    async fn package_for(
        &self,
        draft: &ApplicationDraft,
        country_id: Uuid,
    ) -> Result<Option<VisaPackage>, WizardError> {
        if let Some(package_id) = draft.travel.package_id {
            let package: VisaPackage = self.catalog.get(package_id).await?;
            if package.country_id != country_id {
                return Err(ValidationError::Invalid {
                    field: "package_id",
                    reason: "package belongs to a different country".to_string(),
                }
                .into());
            }
            return Ok(Some(package));
        }

        let packages = self
            .catalog
            .select::<VisaPackage>(Query::all().eq("country_id", country_id.to_string()))
            .await?;
        Ok(active_package_for(&packages, country_id)
            .filter(|package| package.is_active)
            .cloned())
    }

    async fn check_required_documents(
        &self,
        draft: &ApplicationDraft,
        country_id: Uuid,
    ) -> Result<(), WizardError> {
        let checklist = self
            .catalog
            .select::<DocumentChecklistItem>(Query::all().eq("country_id", country_id.to_string()))
            .await?;
        let missing: Vec<&str> = checklist
            .iter()
            .filter(|item| item.is_required)
            .filter(|item| {
                !draft
                    .documents
                    .iter()
                    .any(|doc| doc.document_name.eq_ignore_ascii_case(item.document_name.trim()))
            })
            .map(|item| item.document_name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Invalid {
                field: "documents",
                reason: format!("missing required documents: {}", missing.join(", ")),
            }
            .into())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Step(#[from] WizardStepError),
    #[error("application draft {0} not found")]
    DraftNotFound(Uuid),
    #[error("application {0} not found")]
    ApplicationNotFound(Uuid),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ValidationError> for WizardError {
    fn from(value: ValidationError) -> Self {
        Self::Step(WizardStepError::Validation(value))
    }
}

impl WizardError {
    pub fn status(&self) -> StatusCode {
        match self {
            WizardError::Step(WizardStepError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            WizardError::Step(_) => StatusCode::CONFLICT,
            WizardError::DraftNotFound(_) | WizardError::ApplicationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            WizardError::Catalog(CatalogError::NotFound { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            WizardError::Catalog(error) => error.status(),
            WizardError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Step the draft is on, for errors raised while moving through the wizard.
    pub fn current_step(&self) -> Option<WizardStep> {
        match self {
            WizardError::Step(WizardStepError::NotAtReview { current }) => Some(*current),
            _ => None,
        }
    }
}

impl IntoResponse for WizardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let payload = match &self {
            WizardError::Step(WizardStepError::Validation(error)) => json!({
                "error": self.to_string(),
                "validation": error,
            }),
            _ => json!({
                "error": self.to_string(),
                "step": self.current_step(),
            }),
        };
        (status, axum::Json(payload)).into_response()
    }
}
