//! Cache Module
//!
//! Typed get/set/batch/invalidate over a [`RemoteStore`](crate::store::RemoteStore).
//! Store failures degrade to cache misses; only caller-side mistakes (oversized
//! batches, values that cannot be encoded) come back as errors.

mod codec;
mod keyspaces;
mod typed;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use codec::KeySpace;
pub use keyspaces::{IdToUuid, IdToUuidCache, UuidToId, UuidToIdCache};
pub use typed::TypedCache;

use crate::error::{CacheError, Result};

// == Public Constants ==
/// Maximum keys or entries accepted by a single batch operation
pub const MAX_BATCH_SIZE: usize = 100;

/// Default TTL in seconds for both key spaces
pub const DEFAULT_TTL_SECS: u64 = 600;

/// Rejects batches larger than `limit`.
pub fn check_batch_size(requested: usize, limit: usize) -> Result<()> {
    if requested > limit {
        return Err(CacheError::Validation { requested, limit });
    }
    Ok(())
}
