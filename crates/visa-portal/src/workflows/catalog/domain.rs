use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::resource::{Resource, ResourceKind};
use super::validation::{
    non_negative_amount, positive_days, RequiredFields, Validate, ValidationError,
};
use crate::backend::{encode_row, BackendError, Row};

pub(crate) const DEFAULT_PACKAGE_NAME: &str = "Standard Visa";

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_string()
}

/// Destination country as shown on the admin and public screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entry_requirements: Option<String>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload of the Add/Edit Country form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_requirements: Option<String>,
    #[serde(default)]
    pub is_popular: bool,
}

impl Validate for CountryDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        RequiredFields::new()
            .text("name", &self.name)
            .text("flag", &self.flag)
            .text("banner", &self.banner)
            .text("description", &self.description)
            .finish()
    }
}

impl Resource for Country {
    type Draft = CountryDraft;
    const KIND: ResourceKind = ResourceKind::Countries;

    fn id(&self) -> Uuid {
        self.id
    }

    fn country_scope(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn dependents() -> &'static [(&'static str, &'static str)] {
        &[
            ("visa_packages", "country_id"),
            ("document_checklist", "country_id"),
            ("visa_types", "country_id"),
        ]
    }

    fn default_order() -> &'static str {
        "name"
    }
}

/// Pricing for a country's visa. At most one active package exists per country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaPackage {
    pub id: Uuid,
    pub country_id: Uuid,
    #[serde(default = "default_package_name")]
    pub name: String,
    pub government_fee: f64,
    pub service_fee: f64,
    pub processing_days: i32,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VisaPackage {
    /// Stored total, or the fee sum when the column is absent from the schema.
    pub fn total(&self) -> f64 {
        self.total_price
            .unwrap_or(self.government_fee + self.service_fee)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaPackageDraft {
    pub country_id: Uuid,
    #[serde(default = "default_package_name")]
    pub name: String,
    pub government_fee: f64,
    pub service_fee: f64,
    pub processing_days: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl VisaPackageDraft {
    pub fn total_price(&self) -> f64 {
        self.government_fee + self.service_fee
    }
}

impl Validate for VisaPackageDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        RequiredFields::new().text("name", &self.name).finish()?;
        non_negative_amount("government_fee", self.government_fee)?;
        non_negative_amount("service_fee", self.service_fee)?;
        positive_days("processing_days", self.processing_days)
    }
}

impl Resource for VisaPackage {
    type Draft = VisaPackageDraft;
    const KIND: ResourceKind = ResourceKind::VisaPackages;

    fn id(&self) -> Uuid {
        self.id
    }

    fn country_scope(&self) -> Option<Uuid> {
        Some(self.country_id)
    }

    fn exclusive_activation(draft: &Self::Draft) -> Option<(&'static str, Uuid)> {
        draft.is_active.then_some(("country_id", draft.country_id))
    }

    fn draft_row(draft: &Self::Draft) -> Result<Row, BackendError> {
        let mut row = encode_row(draft)?;
        row.insert("total_price".to_string(), Value::from(draft.total_price()));
        Ok(row)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[default]
    Single,
    Multiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaType {
    pub id: Uuid,
    pub country_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub validity_days: i32,
    #[serde(default)]
    pub max_stay_days: i32,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaTypeDraft {
    pub country_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub validity_days: i32,
    pub max_stay_days: i32,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for VisaTypeDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        RequiredFields::new().text("name", &self.name).finish()?;
        positive_days("validity_days", self.validity_days)?;
        positive_days("max_stay_days", self.max_stay_days)?;
        if self.max_stay_days > self.validity_days {
            return Err(ValidationError::Invalid {
                field: "max_stay_days",
                reason: "cannot exceed validity_days".to_string(),
            });
        }
        Ok(())
    }
}

impl Resource for VisaType {
    type Draft = VisaTypeDraft;
    const KIND: ResourceKind = ResourceKind::VisaTypes;

    fn id(&self) -> Uuid {
        self.id
    }

    fn country_scope(&self) -> Option<Uuid> {
        Some(self.country_id)
    }

    fn dependents() -> &'static [(&'static str, &'static str)] {
        &[("pricing_tiers", "visa_type_id")]
    }

    fn default_order() -> &'static str {
        "name"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonService {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub delivery_days: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonServiceDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_days: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for AddonServiceDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        RequiredFields::new().text("name", &self.name).finish()?;
        non_negative_amount("price", self.price)?;
        if let Some(days) = self.delivery_days {
            positive_days("delivery_days", days)?;
        }
        Ok(())
    }
}

impl Resource for AddonService {
    type Draft = AddonServiceDraft;
    const KIND: ResourceKind = ResourceKind::AddonServices;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> &'static str {
        "name"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChecklistItem {
    pub id: Uuid,
    pub country_id: Uuid,
    pub document_name: String,
    #[serde(default)]
    pub document_description: Option<String>,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChecklistDraft {
    pub country_id: Uuid,
    #[serde(default)]
    pub document_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_description: Option<String>,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl Validate for DocumentChecklistDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        RequiredFields::new()
            .text("document_name", &self.document_name)
            .finish()?;
        if self.sort_order < 0 {
            return Err(ValidationError::Negative {
                field: "sort_order",
            });
        }
        Ok(())
    }
}

impl Resource for DocumentChecklistItem {
    type Draft = DocumentChecklistDraft;
    const KIND: ResourceKind = ResourceKind::DocumentChecklist;

    fn id(&self) -> Uuid {
        self.id
    }

    fn country_scope(&self) -> Option<Uuid> {
        Some(self.country_id)
    }

    fn default_order() -> &'static str {
        "sort_order"
    }
}

/// Speed/price option for a visa type (standard, express, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub id: Uuid,
    pub visa_type_id: Uuid,
    pub name: String,
    pub price: f64,
    pub processing_days: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTierDraft {
    pub visa_type_id: Uuid,
    #[serde(default)]
    pub name: String,
    pub price: f64,
    pub processing_days: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for PricingTierDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        RequiredFields::new().text("name", &self.name).finish()?;
        non_negative_amount("price", self.price)?;
        positive_days("processing_days", self.processing_days)
    }
}

impl Resource for PricingTier {
    type Draft = PricingTierDraft;
    const KIND: ResourceKind = ResourceKind::PricingTiers;

    fn id(&self) -> Uuid {
        self.id
    }

    fn default_order() -> &'static str {
        "price"
    }
}
