use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::{extract::WithRejection, TypedHeader};
use headers::{authorization::Bearer, Authorization};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Caller, User};
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{CreateDentistRequest, Dentist, DentistError, UpdateDentistRequest};
use crate::services::{DentistListParams, DentistService};

fn parse_dentist_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("No dentist with the id of {}", raw)))
}

/// Lookup failures: a missing record is a 404, anything else is logged and hidden.
fn lookup_error(err: DentistError, action: &str) -> AppError {
    match err {
        DentistError::NotFound(id) => AppError::NotFound(format!("No dentist with the id of {}", id)),
        DentistError::Validation(detail) => AppError::ValidationError(detail),
        other => {
            error!("Failed to {}: {}", action, other);
            AppError::BadRequest(format!("Cannot {}", action))
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_dentists(
    State(state): State<Arc<AppConfig>>,
    WithRejection(Query(query), _): WithRejection<Query<Vec<(String, String)>>, AppError>,
) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let list_failed = |e: DentistError| {
        error!("Failed to list dentists: {}", e);
        AppError::BadRequest("Cannot list dentists".to_string())
    };

    let params = DentistListParams::from_pairs(&query).map_err(list_failed)?;
    let dentist_service = DentistService::new(&state);

    let (dentists, total) = dentist_service.list_dentists(&params).await.map_err(list_failed)?;
    let pagination = params.pagination(total);

    Ok(Json(ApiResponse::paginated(dentists, pagination)))
}

#[axum::debug_handler]
pub async fn get_dentist(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<String>,
) -> Result<Json<ApiResponse<Dentist>>, AppError> {
    let dentist_id = parse_dentist_id(&dentist_id)?;
    let dentist_service = DentistService::new(&state);

    let dentist = dentist_service
        .get_dentist(dentist_id, None)
        .await
        .map_err(|e| lookup_error(e, "find dentist"))?;

    Ok(Json(ApiResponse::ok(dentist)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_dentist(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<CreateDentistRequest>, AppError>,
) -> Result<(StatusCode, Json<ApiResponse<Dentist>>), AppError> {
    let caller = Caller::from_user(&user)?;
    caller.require_admin("create dentists")?;

    let dentist_service = DentistService::new(&state);
    let dentist = dentist_service
        .create_dentist(request, auth.token())
        .await
        .map_err(|e| lookup_error(e, "create dentist"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(dentist))))
}

#[axum::debug_handler]
pub async fn update_dentist(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateDentistRequest>, AppError>,
) -> Result<Json<ApiResponse<Dentist>>, AppError> {
    let caller = Caller::from_user(&user)?;
    caller.require_admin("update dentists")?;
    let dentist_id = parse_dentist_id(&dentist_id)?;

    let dentist_service = DentistService::new(&state);
    let dentist = dentist_service
        .update_dentist(dentist_id, request, auth.token())
        .await
        .map_err(|e| lookup_error(e, "update dentist"))?;

    Ok(Json(ApiResponse::ok(dentist)))
}

#[axum::debug_handler]
pub async fn delete_dentist(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let caller = Caller::from_user(&user)?;
    caller.require_admin("delete dentists")?;
    let dentist_id = parse_dentist_id(&dentist_id)?;

    let dentist_service = DentistService::new(&state);
    let summary = dentist_service
        .delete_dentist(dentist_id, auth.token())
        .await
        .map_err(|e| lookup_error(e, "delete dentist"))?;

    info!(
        "Dentist {} deleted by {} along with {} bookings",
        summary.dentist_id, caller.id, summary.bookings_removed
    );

    Ok(Json(ApiResponse::empty()))
}
