//! API Module
//!
//! HTTP handlers and routing for the user lookup service.
//!
//! # Endpoints
//! - `GET /users` - List all users
//! - `GET /users/:uuid` - Fetch a user by uuid
//! - `GET /users/id/:id` - Fetch a user by internal id
//! - `POST /users/lookup` - Batch fetch by uuid
//! - `GET /health` - Store health

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
