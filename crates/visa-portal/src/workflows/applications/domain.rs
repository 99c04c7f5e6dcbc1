use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Step 1 of the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
}

/// Step 2: destination, package and trip dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelInfo {
    #[serde(default)]
    pub country_id: Option<Uuid>,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
}

/// Step 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassportInfo {
    #[serde(default)]
    pub passport_number: String,
    #[serde(default)]
    pub issuing_country: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Metadata of an uploaded file. The bytes themselves live in object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub document_name: String,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

/// A submitted application as stored in `visa_applications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaApplication {
    pub id: Uuid,
    pub reference_number: String,
    pub country_id: Uuid,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    pub passport_number: String,
    #[serde(default)]
    pub passport_issuing_country: Option<String>,
    #[serde(default)]
    pub passport_issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub passport_expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub documents: Vec<DocumentUpload>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
    pub total_amount: f64,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `VISA-<YYYYMMDD>-<6 hex>`.
pub fn reference_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_ascii_uppercase();
    format!("VISA-{}-{suffix}", now.format("%Y%m%d"))
}
