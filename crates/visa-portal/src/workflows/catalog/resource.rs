use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{
    AddonService, Country, DocumentChecklistItem, PricingTier, VisaPackage, VisaType,
};
use super::validation::Validate;
use crate::backend::{encode_row, BackendError, Row};

/// Every table the admin screens and the wizard touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Countries,
    VisaPackages,
    VisaTypes,
    AddonServices,
    DocumentChecklist,
    PricingTiers,
    VisaApplications,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Countries,
        ResourceKind::VisaPackages,
        ResourceKind::VisaTypes,
        ResourceKind::AddonServices,
        ResourceKind::DocumentChecklist,
        ResourceKind::PricingTiers,
        ResourceKind::VisaApplications,
    ];

    pub const fn table(self) -> &'static str {
        match self {
            ResourceKind::Countries => "countries",
            ResourceKind::VisaPackages => "visa_packages",
            ResourceKind::VisaTypes => "visa_types",
            ResourceKind::AddonServices => "addon_services",
            ResourceKind::DocumentChecklist => "document_checklist",
            ResourceKind::PricingTiers => "pricing_tiers",
            ResourceKind::VisaApplications => "visa_applications",
        }
    }

    /// Path segment used by the admin HTTP routes.
    pub const fn slug(self) -> &'static str {
        match self {
            ResourceKind::Countries => "countries",
            ResourceKind::VisaPackages => "visa-packages",
            ResourceKind::VisaTypes => "visa-types",
            ResourceKind::AddonServices => "addon-services",
            ResourceKind::DocumentChecklist => "document-checklist",
            ResourceKind::PricingTiers => "pricing-tiers",
            ResourceKind::VisaApplications => "applications",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Countries => "Countries",
            ResourceKind::VisaPackages => "Visa packages",
            ResourceKind::VisaTypes => "Visa types",
            ResourceKind::AddonServices => "Addon services",
            ResourceKind::DocumentChecklist => "Document checklist items",
            ResourceKind::PricingTiers => "Pricing tiers",
            ResourceKind::VisaApplications => "Visa applications",
        }
    }

    /// Accepts either the route slug or the table name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == value || kind.table() == value)
    }
}

impl ResourceKind {
    /// `(table, column)` pairs referencing rows of this kind.
    pub fn dependents(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ResourceKind::Countries => Country::dependents(),
            ResourceKind::VisaPackages => VisaPackage::dependents(),
            ResourceKind::VisaTypes => VisaType::dependents(),
            ResourceKind::AddonServices => AddonService::dependents(),
            ResourceKind::DocumentChecklist => DocumentChecklistItem::dependents(),
            ResourceKind::PricingTiers => PricingTier::dependents(),
            ResourceKind::VisaApplications => &[],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A catalog table with a typed row and a validated create/update payload.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Draft: Validate + Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    const KIND: ResourceKind;

    fn id(&self) -> Uuid;

    /// Country whose public pages show this row.
    fn country_scope(&self) -> Option<Uuid> {
        None
    }

    /// Rows in other tables removed before this row is deleted.
    fn dependents() -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Column that admin lists sort by when no explicit order is requested.
    fn default_order() -> &'static str {
        "created_at"
    }

    /// Scope in which at most one row may be active at a time, if the draft activates one.
    fn exclusive_activation(_draft: &Self::Draft) -> Option<(&'static str, Uuid)> {
        None
    }

    fn draft_row(draft: &Self::Draft) -> Result<Row, BackendError> {
        encode_row(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_slugs_and_tables() {
        assert_eq!(
            ResourceKind::parse("visa-packages"),
            Some(ResourceKind::VisaPackages)
        );
        assert_eq!(
            ResourceKind::parse("document_checklist"),
            Some(ResourceKind::DocumentChecklist)
        );
        assert_eq!(ResourceKind::parse("profiles"), None);
    }

    #[test]
    fn serde_names_match_tables() {
        for kind in ResourceKind::ALL {
            let encoded = serde_json::to_value(kind).expect("serializes");
            assert_eq!(encoded, serde_json::Value::String(kind.table().to_string()));
        }
    }
}
