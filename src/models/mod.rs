//! Request and Response models for the user cache API
//!
//! DTOs for the HTTP bodies. Users serialize straight from [`UserRecord`],
//! which keeps the internal id out of every response.
//!
//! [`UserRecord`]: crate::users::UserRecord

pub mod requests;
pub mod responses;

pub use requests::BatchLookupRequest;
pub use responses::{BatchLookupResponse, ErrorResponse, HealthResponse, UsersResponse};
