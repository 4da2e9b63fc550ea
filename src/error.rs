//! Error types for the user cache
//!
//! Three layers of errors, from the wire up:
//! - [`StoreError`]: a remote store call failed (never leaves the cache core)
//! - [`CacheError`]: the public cache taxonomy
//! - [`ApiError`]: what the HTTP layer turns into a response

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error ==
/// Failure at the transport boundary.
///
/// The cache core pattern-matches on this and degrades to a miss or a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection refused, reset, closed or never established
    #[error("connection error: {0}")]
    Connection(String),

    /// The store did not answer within the configured timeout
    #[error("operation timed out")]
    Timeout,

    /// The store answered with something we did not expect
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal()
        {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Protocol(err.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        match err {
            deadpool_redis::PoolError::Backend(inner) => inner.into(),
            deadpool_redis::PoolError::Timeout(_) => StoreError::Timeout,
            other => StoreError::Connection(other.to_string()),
        }
    }
}

/// Result type for remote store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Codec Error ==
/// A key space could not encode or decode a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

// == Cache Error ==
/// Errors that cross the cache boundary.
///
/// Only `Validation` and `Serialization` are returned from cache operations.
/// `Connection` is returned by `ConnectionManager::connect` alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Caller broke an input contract
    #[error("batch size {requested} exceeds maximum of {limit}")]
    Validation { requested: usize, limit: usize },

    /// A value could not be encoded for writing
    #[error("failed to serialize value: {0}")]
    Serialization(String),

    /// Stored bytes could not be decoded
    #[error("failed to deserialize value: {0}")]
    Deserialization(String),

    /// The store could not be reached at startup
    #[error("failed to connect to cache store: {0}")]
    Connection(String),
}

/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Api Error ==
/// Errors returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Malformed request data
    #[error("{0}")]
    InvalidRequest(String),

    /// Error surfaced by the cache layer
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Cache(CacheError::Validation { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Cache(CacheError::Connection(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}
