//! Request DTOs for the user cache API

use serde::Deserialize;
use uuid::Uuid;

/// Request body for `POST /users/lookup`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchLookupRequest {
    pub uuids: Vec<Uuid>,
}
