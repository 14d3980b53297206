use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use dentist_cell::models::{DentistError, DentistSummary};
use notification_cell::models::BookingNotice;
use shared_database::SupabaseError;

/// Bookings a single user may hold at once.
///
/// The booking flow this replaces documented a three-booking allowance in a
/// comment but enforced one; the enforced value is kept.
pub const BOOKING_QUOTA: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub user_id: Uuid,
    pub booking_date: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn notice(&self) -> BookingNotice {
        BookingNotice {
            booking_id: self.id,
            user_id: self.user_id,
            dentist_id: self.dentist_id,
            booking_date: self.booking_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub tel: Option<String>,
}

/// Booking row with its populated references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dentist: Option<DentistSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Accepts RFC 3339 timestamps, offset-less `YYYY-MM-DDTHH:MM:SS` (read as
/// UTC) and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_booking_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn invalid_date<E: de::Error>(raw: &str) -> E {
    E::custom(format!("invalid booking date {:?}", raw))
}

fn deserialize_booking_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_booking_date(&raw).ok_or_else(|| invalid_date(&raw))
}

fn deserialize_optional_booking_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_booking_date(&raw).ok_or_else(|| invalid_date(&raw)))
        .transpose()
}

/// Blank query values mean "not given".
pub fn optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => Uuid::parse_str(raw.trim())
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid dentist id {:?}", raw))),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(alias = "bookingDate", deserialize_with = "deserialize_booking_date")]
    pub booking_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default, alias = "bookingDate", deserialize_with = "deserialize_optional_booking_date")]
    pub booking_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "dentist")]
    pub dentist_id: Option<Uuid>,
}

impl UpdateBookingRequest {
    pub fn is_empty(&self) -> bool {
        self.booking_date.is_none() && self.dentist_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    View,
    Update,
    Delete,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::View => "view",
            BookingAction::Update => "update",
            BookingAction::Delete => "delete",
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("No booking with the id of {0}")]
    NotFound(Uuid),

    #[error("No dentist with the id of {0}")]
    DentistNotFound(Uuid),

    #[error("User {user} is not authorized to {action} this booking")]
    Forbidden { user: Uuid, action: BookingAction },

    #[error("The user with ID {user} has already made {quota} bookings")]
    QuotaExceeded { user: Uuid, quota: u64 },

    #[error("Booking was not created")]
    NotCreated,

    #[error("Dentist lookup failed: {0}")]
    Dentist(DentistError),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl From<DentistError> for BookingError {
    fn from(err: DentistError) -> Self {
        match err {
            DentistError::Database(e) => BookingError::Database(e),
            other => BookingError::Dentist(other),
        }
    }
}
