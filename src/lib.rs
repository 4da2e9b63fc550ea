//! User Cache - typed Redis-backed id mapping cache
//!
//! Maps users' external UUIDs to internal ids and back through a remote
//! key/value store, with batch operations, self-healing of corrupt entries,
//! and a connection manager that keeps the store handle alive.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod store;
pub mod users;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use manager::{ConnectionManager, ConnectionState, HealthStatus};
