use serde::Serialize;
use uuid::Uuid;

/// Input rejected before any database call is made.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("country {country_id} already has an active visa package ({existing})")]
    DuplicateActivePackage { country_id: Uuid, existing: Uuid },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Collects blank text fields so the caller can report them together.
#[derive(Debug, Default)]
pub(crate) struct RequiredFields {
    missing: Vec<&'static str>,
}

impl RequiredFields {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text(mut self, field: &'static str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.missing.push(field);
        }
        self
    }

    pub(crate) fn finish(self) -> Result<(), ValidationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields {
                fields: self.missing,
            })
        }
    }
}

pub(crate) fn non_negative_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::Invalid {
            field,
            reason: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(())
}

pub(crate) fn positive_days(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if value <= 0 {
        Err(ValidationError::NotPositive { field })
    } else {
        Ok(())
    }
}
