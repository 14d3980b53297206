use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn dentist_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/dentists", get(handlers::list_dentists))
        .route("/dentists/{dentist_id}", get(handlers::get_dentist));

    // Admin role is checked per handler
    let protected_routes = Router::new()
        .route("/dentists", post(handlers::create_dentist))
        .route(
            "/dentists/{dentist_id}",
            put(handlers::update_dentist).delete(handlers::delete_dentist),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
