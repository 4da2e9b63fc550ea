//! Typed Cache Module
//!
//! The generic cache contract. A `TypedCache<S>` owns nothing but a shared
//! store handle and its TTL; every key and value passes through the key space
//! `S` on the way in and out.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{check_batch_size, KeySpace, MAX_BATCH_SIZE};
use crate::error::{CacheError, Result};
use crate::store::{effective_ttl, RemoteStore};

// == Typed Cache ==
/// Typed view of one key space in the remote store.
///
/// # Failure policy
/// - store unreachable, timed out or returned garbage: logged, behaves as a miss
/// - stored bytes fail to decode: logged as critical, entry deleted, miss
/// - value fails to encode: [`CacheError::Serialization`]
/// - batch over the ceiling: [`CacheError::Validation`]
pub struct TypedCache<S: KeySpace> {
    store: Arc<dyn RemoteStore>,
    ttl: Option<u64>,
    max_batch_size: usize,
    _space: PhantomData<fn() -> S>,
}

impl<S: KeySpace> TypedCache<S> {
    // == Constructors ==
    /// Creates a cache using the key space's default TTL.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_ttl(store, S::DEFAULT_TTL)
    }

    /// Creates a cache with an explicit TTL in seconds (None or 0 = no expiry).
    /// TTLs beyond [`MAX_TTL_SECS`](crate::store::MAX_TTL_SECS) are clamped.
    pub fn with_ttl(store: Arc<dyn RemoteStore>, ttl: Option<u64>) -> Self {
        Self {
            store,
            ttl: effective_ttl(ttl),
            max_batch_size: MAX_BATCH_SIZE,
            _space: PhantomData,
        }
    }

    /// Overrides the batch ceiling.
    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = limit;
        self
    }

    pub fn namespace(&self) -> &'static str {
        S::NAMESPACE
    }

    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    // == Get ==
    /// Fetches and decodes the value for `key`. Every failure reads as None.
    pub async fn get(&self, key: &S::Key) -> Option<S::Value> {
        let store_key = S::encode_key(key);

        let raw = match self.store.get(&store_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!(
                    namespace = S::NAMESPACE,
                    key = %store_key,
                    error = %err,
                    "Cache read failed, treating as miss"
                );
                return None;
            }
        };

        self.decode_or_evict(&store_key, &raw).await
    }

    // == Set ==
    /// Encodes and writes `value`. Only an encoding failure is returned.
    pub async fn set(&self, key: &S::Key, value: &S::Value) -> Result<()> {
        let store_key = S::encode_key(key);
        let payload = S::serialize(value).map_err(|e| CacheError::Serialization(e.to_string()))?;

        if let Err(err) = self.store.set(&store_key, &payload, self.ttl).await {
            warn!(
                namespace = S::NAMESPACE,
                key = %store_key,
                error = %err,
                "Cache write failed, skipping"
            );
        }
        Ok(())
    }

    // == Invalidate ==
    /// Deletes the entry for `key`; absent keys are fine.
    pub async fn invalidate(&self, key: &S::Key) {
        self.delete_raw(&S::encode_key(key)).await;
    }

    // == Batch Get ==
    /// Fetches many keys in one round trip.
    ///
    /// Every requested key is present in the result. A failed round trip maps
    /// every key to None; a corrupt entry maps only its own key to None.
    pub async fn batch_get(&self, keys: &[S::Key]) -> Result<HashMap<S::Key, Option<S::Value>>> {
        check_batch_size(keys.len(), self.max_batch_size)?;
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let store_keys: Vec<String> = keys.iter().map(S::encode_key).collect();

        let raws = match self.store.mget(&store_keys).await {
            Ok(raws) => raws,
            Err(err) => {
                error!(
                    namespace = S::NAMESPACE,
                    keys = keys.len(),
                    error = %err,
                    "Cache batch read failed, treating all as misses"
                );
                return Ok(keys.iter().map(|key| (key.clone(), None)).collect());
            }
        };

        let mut results = HashMap::with_capacity(keys.len());
        for ((key, store_key), raw) in keys.iter().zip(&store_keys).zip(raws) {
            let value = match raw {
                Some(raw) => self.decode_or_evict(store_key, &raw).await,
                None => None,
            };
            results.insert(key.clone(), value);
        }
        for key in keys {
            results.entry(key.clone()).or_insert(None);
        }

        debug!(
            namespace = S::NAMESPACE,
            requested = keys.len(),
            hits = results.values().filter(|v| v.is_some()).count(),
            "Cache batch read"
        );
        Ok(results)
    }

    // == Batch Set ==
    /// Writes many entries in one atomic pipeline.
    ///
    /// All values are encoded before anything is sent, so one bad value
    /// aborts the whole batch and nothing is written.
    pub async fn batch_set(&self, entries: &HashMap<S::Key, S::Value>) -> Result<()> {
        check_batch_size(entries.len(), self.max_batch_size)?;
        if entries.is_empty() {
            return Ok(());
        }

        let encoded = entries
            .iter()
            .map(|(key, value)| {
                S::serialize(value)
                    .map(|payload| (S::encode_key(key), payload))
                    .map_err(|e| CacheError::Serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Err(err) = self.store.set_many(&encoded, self.ttl).await {
            warn!(
                namespace = S::NAMESPACE,
                entries = encoded.len(),
                error = %err,
                "Cache batch write failed, skipping"
            );
        }
        Ok(())
    }

    // == Internals ==
    async fn decode_or_evict(&self, store_key: &str, raw: &[u8]) -> Option<S::Value> {
        match S::deserialize(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                let err = CacheError::Deserialization(err.to_string());
                error!(
                    severity = "critical",
                    namespace = S::NAMESPACE,
                    key = %store_key,
                    error = %err,
                    "Corrupt cache entry, invalidating"
                );
                self.delete_raw(store_key).await;
                None
            }
        }
    }

    async fn delete_raw(&self, store_key: &str) {
        if let Err(err) = self.store.delete(store_key).await {
            warn!(
                namespace = S::NAMESPACE,
                key = %store_key,
                error = %err,
                "Cache invalidation failed"
            );
        }
    }
}

impl<S: KeySpace> Clone for TypedCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttl: self.ttl,
            max_batch_size: self.max_batch_size,
            _space: PhantomData,
        }
    }
}

impl<S: KeySpace> fmt::Debug for TypedCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCache")
            .field("namespace", &S::NAMESPACE)
            .field("ttl", &self.ttl)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}
