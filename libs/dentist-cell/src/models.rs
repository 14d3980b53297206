use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;

pub const NAME_MAX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dentist {
    pub id: Uuid,
    pub name: String,
    pub hospital: String,
    pub address: String,
    pub expertise: String,
    pub tel: Option<String>,
    pub picture: String,
    pub created_at: DateTime<Utc>,
}

/// Projection embedded into booking responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DentistSummary {
    pub name: String,
    pub address: String,
    pub tel: Option<String>,
}

/// Missing string fields deserialize as empty so validation can name them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDentistRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hospital: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub expertise: String,
    pub tel: Option<String>,
    #[serde(default)]
    pub picture: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDentistRequest {
    pub name: Option<String>,
    pub hospital: Option<String>,
    pub address: Option<String>,
    pub expertise: Option<String>,
    pub tel: Option<String>,
    pub picture: Option<String>,
}

/// Result of removing a dentist together with its bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSummary {
    pub dentist_id: Uuid,
    pub bookings_removed: usize,
}

#[derive(Debug, Error)]
pub enum DentistError {
    #[error("No dentist with the id of {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

fn required(value: &str, message: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(message.to_string());
    }
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.push("Please add a name".to_string());
    } else if trimmed.chars().count() > NAME_MAX_LEN {
        errors.push(format!("Name cannot be more than {} characters", NAME_MAX_LEN));
    }
}

fn into_result(errors: Vec<String>) -> Result<(), DentistError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DentistError::Validation(errors.join(", ")))
    }
}

impl CreateDentistRequest {
    pub fn validate(&self) -> Result<(), DentistError> {
        let mut errors = Vec::new();
        check_name(&self.name, &mut errors);
        required(&self.hospital, "Please add hospital", &mut errors);
        required(&self.address, "Please add an address", &mut errors);
        required(&self.expertise, "Please add expertise", &mut errors);
        required(&self.picture, "Please add URL to dentist picture", &mut errors);
        into_result(errors)
    }
}

impl UpdateDentistRequest {
    pub fn validate(&self) -> Result<(), DentistError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(hospital) = &self.hospital {
            required(hospital, "Please add hospital", &mut errors);
        }
        if let Some(address) = &self.address {
            required(address, "Please add an address", &mut errors);
        }
        if let Some(expertise) = &self.expertise {
            required(expertise, "Please add expertise", &mut errors);
        }
        if let Some(picture) = &self.picture {
            required(picture, "Please add URL to dentist picture", &mut errors);
        }
        into_result(errors)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.hospital.is_none()
            && self.address.is_none()
            && self.expertise.is_none()
            && self.tel.is_none()
            && self.picture.is_none()
    }
}
