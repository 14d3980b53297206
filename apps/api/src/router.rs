use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::handlers::BookingState;
use booking_cell::router::booking_routes;
use dentist_cell::router::dentist_routes;
use notification_cell::NotificationService;
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>, notifier: Arc<NotificationService>) -> Router {
    let api = Router::new()
        .merge(dentist_routes(config.clone()))
        .merge(booking_routes(BookingState::new(config, notifier)));

    Router::new()
        .route("/", get(|| async { "Dentist booking API is running!" }))
        .nest("/api/v1", api)
}
