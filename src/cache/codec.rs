//! Key Space Module
//!
//! A key space is everything that distinguishes one typed cache from another:
//! its namespace, how keys become store keys, and how values become text.

use std::hash::Hash;

use crate::error::CodecError;

// == Key Space ==
/// Encoding strategy for one directional mapping.
///
/// Implementations are zero-sized markers; [`TypedCache`](super::TypedCache)
/// is generic over them.
pub trait KeySpace: Send + Sync + 'static {
    /// Lookup key type
    type Key: Eq + Hash + Clone + Send + Sync;
    /// Cached value type
    type Value: Clone + Send + Sync;

    /// Prefix scoping every key of this space in the shared store
    const NAMESPACE: &'static str;

    /// Default TTL in seconds, None = no expiry
    const DEFAULT_TTL: Option<u64>;

    /// Builds the full store key, namespace included.
    fn encode_key(key: &Self::Key) -> String;

    /// Encodes a value for storage.
    fn serialize(value: &Self::Value) -> Result<String, CodecError>;

    /// Decodes stored bytes.
    fn deserialize(raw: &[u8]) -> Result<Self::Value, CodecError>;
}
