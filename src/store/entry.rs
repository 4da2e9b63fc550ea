//! Stored Entry Module
//!
//! A raw value held by the in-process store, with optional expiry.

use std::time::Duration;

use tokio::time::Instant;

// == Stored Entry ==
/// Raw bytes plus an expiry deadline.
///
/// Deadlines use tokio's clock so paused-time tests can step over a TTL.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored bytes
    pub value: Vec<u8>,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry. A TTL of zero seconds, or one too long for the
    /// clock to represent, means no expiry.
    pub fn new(value: Vec<u8>, ttl_seconds: Option<u64>) -> Self {
        let expires_at = ttl_seconds
            .filter(|ttl| *ttl > 0)
            .and_then(|ttl| Instant::now().checked_add(Duration::from_secs(ttl)));

        Self { value, expires_at }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its deadline.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining lifetime, `Some(ZERO)` once expired, None without expiry.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
