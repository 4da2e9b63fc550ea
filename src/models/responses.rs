//! Response DTOs for the user cache API

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::manager::{ConnectionState, HealthStatus};
use crate::users::{BatchLookup, UserRecord};

/// Response body for `GET /users`
#[derive(Debug, Clone, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserRecord>,
    pub count: usize,
}

impl UsersResponse {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}

/// Response body for `POST /users/lookup`
#[derive(Debug, Clone, Serialize)]
pub struct BatchLookupResponse {
    pub users: Vec<UserRecord>,
    pub missing: Vec<Uuid>,
}

impl From<BatchLookup> for BatchLookupResponse {
    fn from(lookup: BatchLookup) -> Self {
        Self {
            users: lookup.found,
            missing: lookup.missing,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub connection: ConnectionState,
    pub redis_connected: bool,
    pub consecutive_failures: u32,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn new(
        status: HealthStatus,
        connection: ConnectionState,
        consecutive_failures: u32,
    ) -> Self {
        Self {
            status,
            connection,
            redis_connected: matches!(
                connection,
                ConnectionState::Connected | ConnectionState::Degraded
            ),
            consecutive_failures,
            timestamp: Utc::now(),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
