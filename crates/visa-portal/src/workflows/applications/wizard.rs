use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::documents::classify_documents;
use super::domain::{DocumentUpload, PassportInfo, PersonalInfo, TravelInfo};
use crate::workflows::catalog::ValidationError;

/// The five wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalInfo,
    TravelInfo,
    PassportInfo,
    Documents,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::PersonalInfo,
        WizardStep::TravelInfo,
        WizardStep::PassportInfo,
        WizardStep::Documents,
        WizardStep::Review,
    ];

    /// 1-based position shown in the progress bar.
    pub fn number(self) -> u8 {
        match self {
            WizardStep::PersonalInfo => 1,
            WizardStep::TravelInfo => 2,
            WizardStep::PassportInfo => 3,
            WizardStep::Documents => 4,
            WizardStep::Review => 5,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::PersonalInfo => Some(WizardStep::TravelInfo),
            WizardStep::TravelInfo => Some(WizardStep::PassportInfo),
            WizardStep::PassportInfo => Some(WizardStep::Documents),
            WizardStep::Documents => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WizardStep::PersonalInfo => None,
            WizardStep::TravelInfo => Some(WizardStep::PersonalInfo),
            WizardStep::PassportInfo => Some(WizardStep::TravelInfo),
            WizardStep::Documents => Some(WizardStep::PassportInfo),
            WizardStep::Review => Some(WizardStep::Documents),
        }
    }
}

/// One section of the form, replaced wholesale by a PATCH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "data", rename_all = "snake_case")]
pub enum SectionUpdate {
    Personal(PersonalInfo),
    Travel(TravelInfo),
    Passport(PassportInfo),
    Documents(Vec<DocumentUpload>),
}

#[derive(Debug, thiserror::Error)]
pub enum WizardStepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("the review step is the last step; submit the application instead")]
    AtFinalStep,
    #[error("applications can only be submitted from the review step (currently at step {})", .current.number())]
    NotAtReview { current: WizardStep },
}

/// In-progress application held between wizard requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub id: Uuid,
    pub step: WizardStep,
    pub personal: PersonalInfo,
    pub travel: TravelInfo,
    pub passport: PassportInfo,
    pub documents: Vec<DocumentUpload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationDraft {
    pub fn new(travel: TravelInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            step: WizardStep::PersonalInfo,
            personal: PersonalInfo::default(),
            travel,
            passport: PassportInfo::default(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: SectionUpdate) -> Result<(), ValidationError> {
        match update {
            SectionUpdate::Personal(personal) => self.personal = personal,
            SectionUpdate::Travel(travel) => self.travel = travel,
            SectionUpdate::Passport(passport) => self.passport = passport,
            SectionUpdate::Documents(mut documents) => {
                classify_documents(&mut documents)?;
                self.documents = documents;
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn validate_step(&self, step: WizardStep) -> Result<(), ValidationError> {
        match step {
            WizardStep::PersonalInfo => validate_personal(&self.personal),
            WizardStep::TravelInfo => validate_travel(&self.travel),
            WizardStep::PassportInfo => validate_passport(&self.passport, &self.travel),
            WizardStep::Documents => validate_documents(&self.documents),
            WizardStep::Review => Ok(()),
        }
    }

    /// Move forward once the current step validates.
    pub fn advance(&mut self) -> Result<WizardStep, WizardStepError> {
        let next = self.step.next().ok_or(WizardStepError::AtFinalStep)?;
        self.validate_step(self.step)?;
        self.step = next;
        self.updated_at = Utc::now();
        Ok(next)
    }

    /// Move back one step; step 1 stays put.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
            self.updated_at = Utc::now();
        }
        self.step
    }

    /// Submission requires the review step and every earlier step to validate.
    pub fn ready_for_submit(&self) -> Result<(), WizardStepError> {
        if self.step != WizardStep::Review {
            return Err(WizardStepError::NotAtReview { current: self.step });
        }
        for step in WizardStep::ALL {
            self.validate_step(step)?;
        }
        Ok(())
    }
}

fn validate_personal(personal: &PersonalInfo) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("first_name", &personal.first_name),
        ("last_name", &personal.last_name),
        ("email", &personal.email),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { fields: missing });
    }
    if !personal.email.contains('@') {
        return Err(ValidationError::Invalid {
            field: "email",
            reason: "must be an email address".to_string(),
        });
    }
    Ok(())
}

fn validate_travel(travel: &TravelInfo) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if travel.country_id.is_none() {
        missing.push("country_id");
    }
    if travel.arrival_date.is_none() {
        missing.push("arrival_date");
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { fields: missing });
    }
    if let (Some(arrival), Some(departure)) = (travel.arrival_date, travel.departure_date) {
        if departure < arrival {
            return Err(ValidationError::Invalid {
                field: "departure_date",
                reason: "cannot be before arrival_date".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_passport(passport: &PassportInfo, travel: &TravelInfo) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if passport.passport_number.trim().is_empty() {
        missing.push("passport_number");
    }
    if passport.issuing_country.trim().is_empty() {
        missing.push("issuing_country");
    }
    if passport.expiry_date.is_none() {
        missing.push("expiry_date");
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { fields: missing });
    }

    let expiry = passport.expiry_date;
    if let (Some(issued), Some(expiry)) = (passport.issue_date, expiry) {
        if expiry <= issued {
            return Err(ValidationError::Invalid {
                field: "expiry_date",
                reason: "must be after issue_date".to_string(),
            });
        }
    }
    let trip_end = travel.departure_date.or(travel.arrival_date);
    if let (Some(trip_end), Some(expiry)) = (trip_end, expiry) {
        if expiry < trip_end {
            return Err(ValidationError::Invalid {
                field: "expiry_date",
                reason: "passport expires before the trip ends".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_documents(documents: &[DocumentUpload]) -> Result<(), ValidationError> {
    if documents.is_empty() {
        return Err(ValidationError::MissingFields {
            fields: vec!["documents"],
        });
    }
    documents
        .iter()
        .try_for_each(|document| super::documents::check_document(document).map(|_| ()))
}
