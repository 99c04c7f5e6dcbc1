//! Five-step visa application wizard and submission.

pub mod documents;
pub mod domain;
pub mod router;
pub mod service;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use documents::{check_document, MAX_DOCUMENT_BYTES};
pub use domain::{
    ApplicationStatus, DocumentUpload, PassportInfo, PersonalInfo, TravelInfo, VisaApplication,
};
pub use router::application_router;
pub use service::{
    ApplicationService, DraftView, StartDraft, WizardError, DEFAULT_DRAFT_TTL, DEFAULT_MAX_DRAFTS,
};
pub use wizard::{ApplicationDraft, SectionUpdate, WizardStep, WizardStepError};
