use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use dentist_cell::models::DentistError;
use shared_database::SupabaseError;

/// Message handed to the mail API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Snapshot of a freshly created booking, detached from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingNotice {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub dentist_id: Uuid,
    pub booking_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    NoRecipient,
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Mail API rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("User lookup failed: {0}")]
    UserLookup(#[from] SupabaseError),

    #[error("Dentist lookup failed: {0}")]
    DentistLookup(#[from] DentistError),
}
