use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Malformed query: {0}")]
    BadQuery(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// PostgREST error body, e.g. `{"code":"23505","message":"duplicate key ..."}`.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

// PostgreSQL integrity constraint violations
const CONSTRAINT_CODES: [&str; 4] = ["23505", "23502", "23503", "23514"];

impl SupabaseError {
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: Option<PostgrestErrorBody> = serde_json::from_str(body).ok();
        let code = parsed.as_ref().and_then(|b| b.code.clone());
        let message = parsed
            .as_ref()
            .and_then(|b| match (&b.message, &b.details) {
                (Some(m), Some(d)) => Some(format!("{} ({})", m, d)),
                (Some(m), None) => Some(m.clone()),
                _ => None,
            })
            .unwrap_or_else(|| body.to_string());

        if code.as_deref().is_some_and(|c| CONSTRAINT_CODES.contains(&c)) {
            return SupabaseError::Constraint(message);
        }

        match status.as_u16() {
            401 | 403 => SupabaseError::Unauthorized(message),
            404 => SupabaseError::NotFound(message),
            409 => SupabaseError::Constraint(message),
            400 => SupabaseError::BadQuery(message),
            other => SupabaseError::Api { status: other, message },
        }
    }
}
