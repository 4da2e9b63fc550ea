//! User Key Spaces
//!
//! The two directional mappings between a user's external UUID and internal
//! integer id. Values are stored as UTF-8 text of their canonical form so
//! entries can be read straight out of the store.
//!
//! TTL guidance (default 600s): around 300s for volatile data, up to 900s for
//! data that rarely changes. Callers pick via [`TypedCache::with_ttl`].

use uuid::Uuid;

use super::{KeySpace, TypedCache, DEFAULT_TTL_SECS};
use crate::error::CodecError;

/// Cache from user UUID to internal id.
pub type UuidToIdCache = TypedCache<UuidToId>;

/// Cache from internal id to user UUID.
pub type IdToUuidCache = TypedCache<IdToUuid>;

fn decode_text(raw: &[u8]) -> Result<&str, CodecError> {
    std::str::from_utf8(raw).map_err(|e| CodecError::new(format!("invalid utf-8: {e}")))
}

// == UUID -> ID ==
/// `user:uuid-to-id:{uuid}` -> decimal id
#[derive(Debug, Clone, Copy)]
pub struct UuidToId;

impl KeySpace for UuidToId {
    type Key = Uuid;
    type Value = i64;

    const NAMESPACE: &'static str = "user:uuid-to-id";
    const DEFAULT_TTL: Option<u64> = Some(DEFAULT_TTL_SECS);

    fn encode_key(key: &Uuid) -> String {
        format!("{}:{}", Self::NAMESPACE, key.hyphenated())
    }

    fn serialize(value: &i64) -> Result<String, CodecError> {
        Ok(value.to_string())
    }

    fn deserialize(raw: &[u8]) -> Result<i64, CodecError> {
        let text = decode_text(raw)?;
        text.parse()
            .map_err(|e| CodecError::new(format!("invalid user id {text:?}: {e}")))
    }
}

// == ID -> UUID ==
/// `user:id-to-uuid:{id}` -> hyphenated uuid
#[derive(Debug, Clone, Copy)]
pub struct IdToUuid;

impl KeySpace for IdToUuid {
    type Key = i64;
    type Value = Uuid;

    const NAMESPACE: &'static str = "user:id-to-uuid";
    const DEFAULT_TTL: Option<u64> = Some(DEFAULT_TTL_SECS);

    fn encode_key(key: &i64) -> String {
        format!("{}:{}", Self::NAMESPACE, key)
    }

    fn serialize(value: &Uuid) -> Result<String, CodecError> {
        Ok(value.hyphenated().to_string())
    }

    fn deserialize(raw: &[u8]) -> Result<Uuid, CodecError> {
        let text = decode_text(raw)?;
        Uuid::parse_str(text).map_err(|e| CodecError::new(format!("invalid uuid {text:?}: {e}")))
    }
}
