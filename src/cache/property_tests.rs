//! Property-Based Tests for Cache Module
//!
//! Uses proptest over the in-process store. Each case drives the async cache
//! on a fresh current-thread runtime.

use proptest::prelude::*;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{IdToUuidCache, KeySpace, UuidToId, UuidToIdCache, MAX_BATCH_SIZE};
use crate::error::CacheError;
use crate::store::{MemoryBackend, MemoryStore};

// == Helpers ==
fn block_on<F: Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

fn uuid_cache() -> (UuidToIdCache, Arc<MemoryBackend>) {
    let backend = MemoryBackend::new();
    let store = Arc::new(MemoryStore::with_backend(backend.clone()));
    (UuidToIdCache::new(store), backend)
}

// == Strategies ==
fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn id_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: Uuid, value: i64 },
    Invalidate { key: Uuid },
}

fn cache_op_strategy(pool: Vec<Uuid>) -> impl Strategy<Value = CacheOp> {
    let keys = prop::sample::select(pool);
    prop_oneof![
        (keys.clone(), id_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        keys.prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a value and reading it back before expiry returns the same value.
    #[test]
    fn prop_roundtrip_uuid_to_id(key in uuid_strategy(), value in id_strategy()) {
        let (cache, _) = uuid_cache();
        let got = block_on(async {
            cache.set(&key, &value).await.unwrap();
            cache.get(&key).await
        });
        prop_assert_eq!(got, Some(value));
    }

    #[test]
    fn prop_roundtrip_id_to_uuid(key in id_strategy(), value in uuid_strategy()) {
        let cache = IdToUuidCache::new(Arc::new(MemoryStore::new()));
        let got = block_on(async {
            cache.set(&key, &value).await.unwrap();
            cache.get(&key).await
        });
        prop_assert_eq!(got, Some(value));
    }

    // Invalidation always leaves the key absent, however many times it runs.
    #[test]
    fn prop_invalidate_removes_entry(
        key in uuid_strategy(),
        value in id_strategy(),
        repeats in 1usize..4
    ) {
        let (cache, backend) = uuid_cache();
        let (got, present) = block_on(async {
            cache.set(&key, &value).await.unwrap();
            for _ in 0..repeats {
                cache.invalidate(&key).await;
            }
            let present = backend.contains_key(&UuidToId::encode_key(&key)).await;
            (cache.get(&key).await, present)
        });
        prop_assert_eq!(got, None);
        prop_assert!(!present);
    }

    // The cache agrees with a plain map after any sequence of sets and invalidations.
    #[test]
    fn prop_matches_model(
        (pool, ops) in prop::collection::vec(uuid_strategy(), 1..8)
            .prop_flat_map(|pool| {
                let ops = prop::collection::vec(cache_op_strategy(pool.clone()), 1..40);
                (Just(pool), ops)
            })
    ) {
        let (cache, _) = uuid_cache();
        let mut model: HashMap<Uuid, i64> = HashMap::new();

        let observed = block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, &value).await.unwrap();
                        model.insert(key, value);
                    }
                    CacheOp::Invalidate { key } => {
                        cache.invalidate(&key).await;
                        model.remove(&key);
                    }
                }
            }
            cache.batch_get(&pool).await.unwrap()
        });

        for key in &pool {
            prop_assert_eq!(observed[key], model.get(key).copied());
        }
    }

    // Batches up to the ceiling succeed, anything above is rejected with both numbers.
    #[test]
    fn prop_batch_ceiling(size in 0usize..=(MAX_BATCH_SIZE * 2)) {
        let (cache, backend) = uuid_cache();
        let keys: Vec<Uuid> = (0..size as u128).map(Uuid::from_u128).collect();
        let entries: HashMap<Uuid, i64> = keys.iter().map(|k| (*k, 1)).collect();

        let (read, write) = block_on(async {
            (cache.batch_get(&keys).await, cache.batch_set(&entries).await)
        });

        if size > MAX_BATCH_SIZE {
            let expected = CacheError::Validation { requested: size, limit: MAX_BATCH_SIZE };
            prop_assert_eq!(read, Err(expected.clone()));
            prop_assert_eq!(write, Err(expected));
            prop_assert_eq!(backend.round_trips(), 0);
        } else {
            prop_assert_eq!(read.unwrap().len(), size);
            prop_assert!(write.is_ok());
            let expected_trips = if size == 0 { 0 } else { 2 };
            prop_assert_eq!(backend.round_trips(), expected_trips);
        }
    }
}
