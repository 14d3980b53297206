// libs/booking-cell/tests/handlers_test.rs

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::{extract::WithRejection, TypedHeader};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::handlers::*;
use booking_cell::models::{CreateBookingRequest, UpdateBookingRequest};
use notification_cell::NotificationService;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const DENTIST_SELECT: &str = "*,dentist:dentists(name,address,tel)";
const FULL_SELECT: &str = "*,dentist:dentists(name,address,tel),user:profiles(name,email,tel)";

fn state_for(server: &MockServer) -> BookingState {
    let config = TestConfig::with_mock_server(&server.uri()).to_arc();
    let notifier = Arc::new(NotificationService::new(&config));
    BookingState::new(config, notifier)
}

fn auth_for(user: &TestUser, state: &BookingState) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(user, &state.config.supabase_jwt_secret, Some(1));
    TypedHeader(Authorization::bearer(&token).unwrap())
}

fn user_extension(user: &TestUser) -> Extension<User> {
    Extension(user.to_user())
}

fn json_body<T>(body: T) -> WithRejection<Json<T>, AppError> {
    WithRejection(Json(body), PhantomData)
}

fn list_query(dentist_id: Option<Uuid>) -> WithRejection<Query<BookingListQuery>, AppError> {
    WithRejection(Query(BookingListQuery { dentist_id }), PhantomData)
}

fn booking_row(id: Uuid, owner: &TestUser, dentist_id: Uuid) -> Value {
    MockSupabaseResponses::booking_response(&id.to_string(), &owner.id, &dentist_id.to_string())
}

fn populated_row(id: Uuid, owner: &TestUser, dentist_id: Uuid, with_user: bool) -> Value {
    let mut row = booking_row(id, owner, dentist_id);
    row["dentist"] = json!({ "name": "Dr. Smile", "address": "Bangkok", "tel": "02-123-4567" });
    if with_user {
        row["user"] = json!({ "name": "Test User", "email": owner.email, "tel": "080-000-0000" });
    }
    row
}

async fn mount_booking_lookup(server: &MockServer, row: Value, booking_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

async fn mount_dentist(server: &MockServer, dentist_id: Uuid, exists: bool) {
    let rows = if exists {
        json!([MockSupabaseResponses::dentist_response(&dentist_id.to_string(), "Dr. Smile")])
    } else {
        json!([])
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/dentists"))
        .and(query_param("id", format!("eq.{}", dentist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

async fn mount_booking_count(server: &MockServer, user: &TestUser, total: u64) {
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", format!("*/{}", total).as_str()))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, method_name: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method_name && r.url.path() == request_path)
        .count()
}

// ==============================================================================
// LIST
// ==============================================================================

#[tokio::test]
async fn test_user_listing_only_returns_own_bookings() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .and(query_param("select", DENTIST_SELECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            populated_row(Uuid::new_v4(), &user, Uuid::new_v4(), false)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = list_bookings(
        State(state.clone()),
        auth_for(&user, &state),
        user_extension(&user),
        list_query(None),
    )
    .await
    .unwrap()
    .0;

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["user_id"], user.id);
    assert_eq!(body["data"][0]["dentist"]["name"], "Dr. Smile");
    assert!(body["data"][0].get("user").is_none());
}

#[tokio::test]
async fn test_admin_listing_by_dentist_includes_both_projections() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let admin = TestUser::admin("admin@example.com");
    let dentist_id = Uuid::new_v4();
    let owners = [TestUser::user("a@example.com"), TestUser::user("b@example.com")];

    let rows: Vec<Value> = owners
        .iter()
        .map(|owner| populated_row(Uuid::new_v4(), owner, dentist_id, true))
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("dentist_id", format!("eq.{}", dentist_id)))
        .and(query_param("select", FULL_SELECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(rows)))
        .expect(1)
        .mount(&server)
        .await;

    let response = list_bookings(
        State(state.clone()),
        auth_for(&admin, &state),
        user_extension(&admin),
        list_query(Some(dentist_id)),
    )
    .await
    .unwrap()
    .0;

    let bookings = response.data.unwrap();
    assert_eq!(bookings.len(), 2);
    for view in &bookings {
        assert_eq!(view.booking.dentist_id, dentist_id);
        let dentist = view.dentist.as_ref().unwrap();
        assert_eq!((dentist.name.as_str(), dentist.address.as_str()), ("Dr. Smile", "Bangkok"));
        let user = view.user.as_ref().unwrap();
        assert_eq!(user.tel.as_deref(), Some("080-000-0000"));
    }

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().all(|(key, _)| key != "user_id"));
}

#[tokio::test]
async fn test_list_failure_is_generic_server_error() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("relation does not exist"))
        .mount(&server)
        .await;

    let result = list_bookings(
        State(state.clone()),
        auth_for(&user, &state),
        user_extension(&user),
        list_query(None),
    )
    .await;

    assert_matches!(result, Err(AppError::Internal(ref msg)) if msg == "Cannot find Booking");
}

// ==============================================================================
// GET
// ==============================================================================

#[tokio::test]
async fn test_get_booking_owner_admin_and_stranger() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let owner = TestUser::user("owner@example.com");
    let admin = TestUser::admin("admin@example.com");
    let stranger = TestUser::user("stranger@example.com");
    let booking_id = Uuid::new_v4();

    mount_booking_lookup(&server, populated_row(booking_id, &owner, Uuid::new_v4(), true), booking_id).await;

    for caller in [&owner, &admin] {
        let response = get_booking(
            State(state.clone()),
            Path(booking_id.to_string()),
            auth_for(caller, &state),
            user_extension(caller),
        )
        .await
        .unwrap()
        .0;
        let view = response.data.unwrap();
        assert_eq!(view.booking.id, booking_id);
        assert!(view.user.is_some());
    }

    let result = get_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&stranger, &state),
        user_extension(&stranger),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(ref msg))
        if msg == &format!("User {} is not authorized to view this booking", stranger.id));
}

#[tokio::test]
async fn test_get_missing_booking() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");
    let booking_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = get_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&user, &state),
        user_extension(&user),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(ref msg))
        if msg == &format!("No booking with the id of {}", booking_id));
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn test_first_booking_succeeds_and_sends_confirmation() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");
    let dentist_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();

    mount_dentist(&server, dentist_id, true).await;
    mount_booking_count(&server, &user, 0).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .and(body_partial_json(json!({ "user_id": user.id, "dentist_id": dentist_id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([booking_row(booking_id, &user, dentist_id)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_response(&user.id, &user.email)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(body_partial_json(json!({
            "to": user.email,
            "subject": format!("Your Booking Confirmation - {}", booking_id)
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let response = create_booking(
        State(state.clone()),
        Path(dentist_id.to_string()),
        auth_for(&user, &state),
        user_extension(&user),
        json_body(CreateBookingRequest { booking_date: chrono::Utc::now() }),
    )
    .await
    .unwrap()
    .0;

    let booking = response.data.unwrap();
    assert_eq!(booking.id, booking_id);
    assert_eq!(booking.user_id, user.uuid());

    // the confirmation is sent after the response, on its own task
    for _ in 0..50 {
        if requests_to(&server, "POST", "/mail/send").await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(requests_to(&server, "POST", "/mail/send").await, 1);
}

#[tokio::test]
async fn test_second_booking_exceeds_quota() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");
    let dentist_id = Uuid::new_v4();

    mount_dentist(&server, dentist_id, true).await;
    mount_booking_count(&server, &user, 1).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = create_booking(
        State(state.clone()),
        Path(dentist_id.to_string()),
        auth_for(&user, &state),
        user_extension(&user),
        json_body(CreateBookingRequest { booking_date: chrono::Utc::now() }),
    )
    .await;

    assert_matches!(result, Err(AppError::BadRequest(ref msg))
        if msg == &format!("The user with ID {} has already made 1 bookings", user.id));
}

#[tokio::test]
async fn test_booking_unknown_dentist() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");
    let dentist_id = Uuid::new_v4();

    mount_dentist(&server, dentist_id, false).await;

    let result = create_booking(
        State(state.clone()),
        Path(dentist_id.to_string()),
        auth_for(&user, &state),
        user_extension(&user),
        json_body(CreateBookingRequest { booking_date: chrono::Utc::now() }),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(ref msg))
        if msg == &format!("No dentist with the id of {}", dentist_id));
    assert_eq!(requests_to(&server, "HEAD", "/rest/v1/bookings").await, 0);
}

#[tokio::test]
async fn test_mail_failure_does_not_affect_response() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");
    let dentist_id = Uuid::new_v4();

    mount_dentist(&server, dentist_id, true).await;
    mount_booking_count(&server, &user, 0).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([booking_row(Uuid::new_v4(), &user, dentist_id)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_string("profiles unavailable"))
        .mount(&server)
        .await;

    let result = create_booking(
        State(state.clone()),
        Path(dentist_id.to_string()),
        auth_for(&user, &state),
        user_extension(&user),
        json_body(CreateBookingRequest { booking_date: chrono::Utc::now() }),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_storage_failure_is_generic() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let user = TestUser::user("patient@example.com");
    let dentist_id = Uuid::new_v4();

    mount_dentist(&server, dentist_id, true).await;
    mount_booking_count(&server, &user, 0).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("database is starting up"))
        .mount(&server)
        .await;

    let result = create_booking(
        State(state.clone()),
        Path(dentist_id.to_string()),
        auth_for(&user, &state),
        user_extension(&user),
        json_body(CreateBookingRequest { booking_date: chrono::Utc::now() }),
    )
    .await;

    assert_matches!(result, Err(AppError::Internal(ref msg)) if msg == "Cannot create Booking");
}

// ==============================================================================
// UPDATE
// ==============================================================================

#[tokio::test]
async fn test_update_by_stranger_is_rejected_before_write() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let owner = TestUser::user("owner@example.com");
    let stranger = TestUser::user("stranger@example.com");
    let booking_id = Uuid::new_v4();

    mount_booking_lookup(&server, booking_row(booking_id, &owner, Uuid::new_v4()), booking_id).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = update_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&stranger, &state),
        user_extension(&stranger),
        json_body(UpdateBookingRequest {
            booking_date: Some(chrono::Utc::now()),
            dentist_id: None,
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Auth(ref msg)) if msg.contains("not authorized to update"));
}

#[tokio::test]
async fn test_owner_updates_booking_date() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let owner = TestUser::user("owner@example.com");
    let booking_id = Uuid::new_v4();
    let dentist_id = Uuid::new_v4();

    mount_booking_lookup(&server, booking_row(booking_id, &owner, dentist_id), booking_id).await;

    let mut updated = booking_row(booking_id, &owner, dentist_id);
    updated["booking_date"] = json!("2025-01-10T09:30:00Z");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .and(body_partial_json(json!({ "booking_date": "2025-01-10T09:30:00Z" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let request: UpdateBookingRequest =
        serde_json::from_value(json!({ "bookingDate": "2025-01-10T09:30:00Z" })).unwrap();
    let response = update_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&owner, &state),
        user_extension(&owner),
        json_body(request),
    )
    .await
    .unwrap()
    .0;

    let booking = response.data.unwrap();
    assert_eq!(booking.booking_date.to_rfc3339(), "2025-01-10T09:30:00+00:00");
}

#[tokio::test]
async fn test_update_to_unknown_dentist() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let admin = TestUser::admin("admin@example.com");
    let owner = TestUser::user("owner@example.com");
    let booking_id = Uuid::new_v4();
    let missing_dentist = Uuid::new_v4();

    mount_booking_lookup(&server, booking_row(booking_id, &owner, Uuid::new_v4()), booking_id).await;
    mount_dentist(&server, missing_dentist, false).await;

    let result = update_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&admin, &state),
        user_extension(&admin),
        json_body(UpdateBookingRequest {
            booking_date: None,
            dentist_id: Some(missing_dentist),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
    assert_eq!(requests_to(&server, "PATCH", "/rest/v1/bookings").await, 0);
}

// ==============================================================================
// DELETE
// ==============================================================================

#[tokio::test]
async fn test_admin_deletes_any_booking() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let admin = TestUser::admin("admin@example.com");
    let owner = TestUser::user("owner@example.com");
    let booking_id = Uuid::new_v4();

    mount_booking_lookup(&server, booking_row(booking_id, &owner, Uuid::new_v4()), booking_id).await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = delete_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&admin, &state),
        user_extension(&admin),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "success": true, "data": {} }));
}

#[tokio::test]
async fn test_delete_by_stranger_and_missing() {
    let server = MockServer::start().await;
    let state = state_for(&server);
    let owner = TestUser::user("owner@example.com");
    let stranger = TestUser::user("stranger@example.com");
    let booking_id = Uuid::new_v4();

    mount_booking_lookup(&server, booking_row(booking_id, &owner, Uuid::new_v4()), booking_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let result = delete_booking(
        State(state.clone()),
        Path(booking_id.to_string()),
        auth_for(&stranger, &state),
        user_extension(&stranger),
    )
    .await;
    assert_matches!(result, Err(AppError::Auth(_)));

    let result = delete_booking(
        State(state.clone()),
        Path(Uuid::new_v4().to_string()),
        auth_for(&owner, &state),
        user_extension(&owner),
    )
    .await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}
