//! Users Module
//!
//! The record type the caches accelerate, an abstract source of records, and
//! the read-through lookup service that sits between them.

mod lookup;
mod source;

use serde::Serialize;
use uuid::Uuid;

pub use lookup::{BatchLookup, UserLookup};
pub use source::{SampleUserSource, UserSource};

// == User Record ==
/// A user as held by the data source. `id` never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}
