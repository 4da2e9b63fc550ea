//! API Routes
//!
//! Configures the Axum router with all user cache endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    get_user_by_id_handler, get_user_handler, health_handler, list_users_handler,
    lookup_users_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /users` - All users
/// - `GET /users/:uuid` - One user by external uuid
/// - `GET /users/id/:id` - One user by internal id
/// - `POST /users/lookup` - Up to 100 users by uuid
/// - `GET /health` - Store health, 503 unless healthy
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/users", get(list_users_handler))
        .route("/users/lookup", post(lookup_users_handler))
        .route("/users/id/:id", get(get_user_by_id_handler))
        .route("/users/:uuid", get(get_user_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
