use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, BookingState};

pub fn booking_routes(state: BookingState) -> Router {
    Router::new()
        .route("/bookings", get(handlers::list_bookings))
        .route(
            "/bookings/{booking_id}",
            get(handlers::get_booking)
                .put(handlers::update_booking)
                .delete(handlers::delete_booking),
        )
        .route("/dentists/{dentist_id}/bookings", post(handlers::create_booking))
        .route_layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
