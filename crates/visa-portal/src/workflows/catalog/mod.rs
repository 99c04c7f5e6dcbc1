//! Admin catalog: countries, packages, visa types, addons, checklists and pricing tiers.

pub mod cache;
pub mod domain;
pub mod import;
pub mod resource;
pub mod router;
pub mod service;
pub mod table;
pub mod validation;

#[cfg(test)]
mod tests;

pub use cache::{Mutation, QueryCache, QueryKey};
pub use domain::{
    AddonService, AddonServiceDraft, Country, CountryDraft, DocumentChecklistDraft,
    DocumentChecklistItem, EntryType, PricingTier, PricingTierDraft, VisaPackage,
    VisaPackageDraft, VisaType, VisaTypeDraft,
};
pub use import::{CatalogImportError, CatalogImporter, ImportReport, ImportRowFailure};
pub use resource::{Resource, ResourceKind};
pub use router::catalog_router;
pub use service::{CatalogError, CatalogService};
pub use table::{missing_last, sort_rows, AdminCountryRow, CountryColumn, SortDirection, SortState};
pub use validation::{Validate, ValidationError};
