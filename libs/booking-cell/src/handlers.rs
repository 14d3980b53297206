use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::{extract::WithRejection, TypedHeader};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use notification_cell::NotificationService;
use shared_config::AppConfig;
use shared_models::auth::{Caller, User};
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{
    Booking, BookingError, BookingView, CreateBookingRequest, UpdateBookingRequest,
};
use crate::services::{BookingQuerySpec, BookingService};

/// Router state: configuration plus the notifier built at startup.
#[derive(Clone)]
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub notifier: Arc<NotificationService>,
}

impl BookingState {
    pub fn new(config: Arc<AppConfig>, notifier: Arc<NotificationService>) -> Self {
        Self { config, notifier }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    /// `?dentistId=` with no value means no dentist filter.
    #[serde(
        default,
        rename = "dentistId",
        alias = "dentist_id",
        deserialize_with = "crate::models::optional_uuid"
    )]
    pub dentist_id: Option<Uuid>,
}

/// Client-facing errors keep their message; everything else is logged and
/// replaced by `fallback`.
fn booking_error(err: BookingError, fallback: &str) -> AppError {
    match err {
        BookingError::NotFound(_) | BookingError::DentistNotFound(_) => AppError::NotFound(err.to_string()),
        BookingError::Forbidden { .. } => AppError::Auth(err.to_string()),
        BookingError::QuotaExceeded { .. } => AppError::BadRequest(err.to_string()),
        other => {
            error!("{}: {}", fallback, other);
            AppError::Internal(fallback.to_string())
        }
    }
}

// Unparseable ids cannot match a record
fn parse_id(raw: &str, resource: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("No {} with the id of {}", resource, raw)))
}

#[axum::debug_handler(state = BookingState)]
pub async fn list_bookings(
    State(state): State<BookingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    WithRejection(Query(query), _): WithRejection<Query<BookingListQuery>, AppError>,
) -> Result<Json<ApiResponse<Vec<BookingView>>>, AppError> {
    let caller = Caller::from_user(&user)?;
    let spec = BookingQuerySpec::list(&caller, query.dentist_id);

    let booking_service = BookingService::new(&state.config);
    let bookings = booking_service
        .list_bookings(&spec, auth.token())
        .await
        .map_err(|e| booking_error(e, "Cannot find Booking"))?;

    Ok(Json(ApiResponse::list(bookings)))
}

#[axum::debug_handler(state = BookingState)]
pub async fn get_booking(
    State(state): State<BookingState>,
    Path(booking_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let caller = Caller::from_user(&user)?;
    let booking_id = parse_id(&booking_id, "booking")?;

    let booking_service = BookingService::new(&state.config);
    let booking = booking_service
        .get_booking(booking_id, &caller, auth.token())
        .await
        .map_err(|e| booking_error(e, "Cannot find Booking"))?;

    Ok(Json(ApiResponse::ok(booking)))
}

/// Responds with the created booking (200) and leaves the confirmation mail
/// to a detached task.
#[axum::debug_handler(state = BookingState)]
pub async fn create_booking(
    State(state): State<BookingState>,
    Path(dentist_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<CreateBookingRequest>, AppError>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    let caller = Caller::from_user(&user)?;
    let dentist_id = parse_id(&dentist_id, "dentist")?;

    let booking_service = BookingService::new(&state.config);
    let booking = booking_service
        .create_booking(dentist_id, request, &caller, auth.token())
        .await
        .map_err(|e| booking_error(e, "Cannot create Booking"))?;

    state
        .notifier
        .dispatch(booking.notice(), Some(auth.token().to_string()));

    Ok(Json(ApiResponse::ok(booking)))
}

#[axum::debug_handler(state = BookingState)]
pub async fn update_booking(
    State(state): State<BookingState>,
    Path(booking_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBookingRequest>, AppError>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    let caller = Caller::from_user(&user)?;
    let booking_id = parse_id(&booking_id, "booking")?;

    let booking_service = BookingService::new(&state.config);
    let booking = booking_service
        .update_booking(booking_id, request, &caller, auth.token())
        .await
        .map_err(|e| booking_error(e, "Cannot update Booking"))?;

    Ok(Json(ApiResponse::ok(booking)))
}

#[axum::debug_handler(state = BookingState)]
pub async fn delete_booking(
    State(state): State<BookingState>,
    Path(booking_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let caller = Caller::from_user(&user)?;
    let booking_id = parse_id(&booking_id, "booking")?;

    let booking_service = BookingService::new(&state.config);
    booking_service
        .delete_booking(booking_id, &caller, auth.token())
        .await
        .map_err(|e| booking_error(e, "Cannot delete Booking"))?;

    Ok(Json(ApiResponse::empty()))
}
