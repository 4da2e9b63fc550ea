//! Store Module
//!
//! The transport boundary between the typed caches and the remote key-value
//! store. Everything below this line speaks strings and bytes and reports
//! failures as [`StoreError`]; everything above it decides what a failure means.
//!
//! # Backends
//! - [`RedisStore`]: pooled connections to a Redis-compatible server
//! - [`MemoryStore`]: in-process store used by tests and `memory://` URLs

mod entry;
mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

pub use self::redis::{RedisConnector, RedisStore};
pub use entry::StoredEntry;
pub use memory::{MemoryBackend, MemoryConnector, MemoryStore};

// == Remote Store ==
/// Commands the cache core needs from the backing store.
///
/// A TTL of `None` (or zero) writes without expiry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// GET: raw bytes stored under `key`, if any
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// SET / SETEX
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> StoreResult<()>;

    /// DEL; deleting an absent key is not an error
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// MGET: one slot per requested key, in request order
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>>;

    /// Writes every entry in one atomic pipeline
    async fn set_many(&self, entries: &[(String, String)], ttl: Option<u64>) -> StoreResult<()>;

    /// PING
    async fn ping(&self) -> StoreResult<()>;

    /// Releases the underlying connections. Later calls fail with a connection error.
    async fn close(&self);
}

// == Store Connector ==
/// Creates fresh store handles with a fixed configuration.
///
/// The `ConnectionManager` calls this once at startup and again for every
/// reconnection.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Builds a new handle. Does not probe it.
    async fn connect(&self) -> StoreResult<Arc<dyn RemoteStore>>;

    /// Target description safe to log (credentials redacted)
    fn describe(&self) -> String;
}

// == Probe ==
/// Issues a PING bounded by `timeout`.
pub async fn probe(store: &dyn RemoteStore, timeout: Duration) -> StoreResult<()> {
    match tokio::time::timeout(timeout, store.ping()).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}

/// Longest TTL handed to a store: one hundred years. Redis rejects expiries
/// that overflow its millisecond clock, so anything longer is clamped.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Normalizes a TTL: zero means no expiry, longer than [`MAX_TTL_SECS`] is clamped.
pub(crate) fn effective_ttl(ttl: Option<u64>) -> Option<u64> {
    ttl.filter(|secs| *secs > 0).map(|secs| secs.min(MAX_TTL_SECS))
}
