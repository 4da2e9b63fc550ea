//! User Source
//!
//! Where records really live. The service only needs point lookups in both
//! directions plus a full listing.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::UserRecord;

// == User Source ==
#[async_trait]
pub trait UserSource: Send + Sync {
    async fn all(&self) -> Vec<UserRecord>;
    async fn find_by_id(&self, id: i64) -> Option<UserRecord>;
    async fn find_by_uuid(&self, uuid: Uuid) -> Option<UserRecord>;
}

// == Sample Source ==
/// Fixed in-memory set of ten users, indexed both ways.
#[derive(Debug, Clone)]
pub struct SampleUserSource {
    users: Vec<UserRecord>,
    by_id: HashMap<i64, usize>,
    by_uuid: HashMap<Uuid, usize>,
}

const SAMPLE_NAMES: [(&str, &str); 10] = [
    ("John", "Doe"),
    ("Jane", "Smith"),
    ("Bob", "Johnson"),
    ("Alice", "Williams"),
    ("Charlie", "Brown"),
    ("Diana", "Davis"),
    ("Edward", "Miller"),
    ("Fiona", "Wilson"),
    ("George", "Moore"),
    ("Hannah", "Taylor"),
];

/// Base of the sample uuids; user N gets `550e8400-e29b-41d4-a716-4466554400NN`.
const SAMPLE_UUID_BASE: u128 = 0x550e8400_e29b_41d4_a716_446655440000;

impl SampleUserSource {
    pub fn new() -> Self {
        let users = SAMPLE_NAMES
            .iter()
            .enumerate()
            .map(|(i, (first, last))| {
                let id = i as i64 + 1;
                UserRecord {
                    id,
                    uuid: sample_uuid(id),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
                }
            })
            .collect();
        Self::from_records(users)
    }

    pub fn from_records(users: Vec<UserRecord>) -> Self {
        let by_id = users.iter().enumerate().map(|(i, u)| (u.id, i)).collect();
        let by_uuid = users.iter().enumerate().map(|(i, u)| (u.uuid, i)).collect();
        Self {
            users,
            by_id,
            by_uuid,
        }
    }
}

impl Default for SampleUserSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Ids print as decimal digits in the last group (id 10 -> ...440010).
fn sample_uuid(id: i64) -> Uuid {
    let digits = format!("{id:02}");
    let suffix = u128::from_str_radix(&digits, 16).unwrap_or_default();
    Uuid::from_u128(SAMPLE_UUID_BASE + suffix)
}

#[async_trait]
impl UserSource for SampleUserSource {
    async fn all(&self) -> Vec<UserRecord> {
        self.users.clone()
    }

    async fn find_by_id(&self, id: i64) -> Option<UserRecord> {
        self.by_id.get(&id).map(|&i| self.users[i].clone())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Option<UserRecord> {
        self.by_uuid.get(&uuid).map(|&i| self.users[i].clone())
    }
}
