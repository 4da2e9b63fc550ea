//! API Handlers
//!
//! HTTP request handlers for each user cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::manager::ConnectionManager;
use crate::models::{BatchLookupRequest, BatchLookupResponse, HealthResponse, UsersResponse};
use crate::users::{SampleUserSource, UserLookup, UserRecord, UserSource};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: ConnectionManager,
    pub lookup: UserLookup,
}

impl AppState {
    pub fn new(manager: ConnectionManager, source: Arc<dyn UserSource>) -> Self {
        let lookup = UserLookup::new(manager.clone(), source);
        Self { manager, lookup }
    }

    /// Wires the configured store to the built-in sample users.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ConnectionManager::from_config(config),
            Arc::new(SampleUserSource::new()),
        )
    }
}

fn parse_uuid(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidRequest(format!("invalid uuid '{raw}'")))
}

/// Handler for GET /users
pub async fn list_users_handler(State(state): State<AppState>) -> Json<UsersResponse> {
    Json(UsersResponse::new(state.lookup.all().await))
}

/// Handler for GET /users/:uuid
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    let uuid = parse_uuid(&raw)?;
    state
        .lookup
        .get_by_uuid(uuid)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("user '{uuid}' not found")))
}

/// Handler for GET /users/id/:id
pub async fn get_user_by_id_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserRecord>> {
    state
        .lookup
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

/// Handler for POST /users/lookup
///
/// Over-sized batches come back as 400 before any store traffic.
pub async fn lookup_users_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchLookupRequest>,
) -> ApiResult<Json<BatchLookupResponse>> {
    let result = state.lookup.get_many_by_uuid(&req.uuids).await?;
    Ok(Json(result.into()))
}

/// Handler for GET /health
///
/// 200 only while the store answers probes, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = state.manager.health().await;
    let response = HealthResponse::new(
        status,
        state.manager.state().await,
        state.manager.consecutive_failures(),
    );
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
