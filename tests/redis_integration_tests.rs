//! Integration Tests against a live Redis
//!
//! Ignored by default. Run with a server at `REDIS_URL`
//! (default `redis://localhost:6379`):
//!
//! ```text
//! cargo test --test redis_integration_tests -- --ignored
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use user_cache::{
    cache::{KeySpace, UuidToId, UuidToIdCache},
    config::ConnectionSettings,
    store::{RedisConnector, RedisStore, RemoteStore},
    CacheError, ConnectionManager, ConnectionState, HealthStatus,
};
use uuid::Uuid;

// == Helper Functions ==

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

fn open_store() -> Arc<RedisStore> {
    Arc::new(RedisStore::open(&redis_url(), &ConnectionSettings::default()).unwrap())
}

async fn connected_manager() -> ConnectionManager {
    let manager = ConnectionManager::new(
        Arc::new(RedisConnector::new(redis_url(), ConnectionSettings::default())),
        ConnectionSettings::default(),
    );
    manager.connect().await.unwrap();
    manager
}

// == Store Tests ==

#[tokio::test]
#[ignore]
async fn test_store_set_get_delete() {
    let store = open_store();
    let key = format!("user-cache-test:{}", Uuid::new_v4());

    store.set(&key, "hello", Some(30)).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some(&b"hello"[..]));

    store.delete(&key).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), None);
    store.close().await;
}

#[tokio::test]
#[ignore]
async fn test_store_mget_preserves_order() {
    let store = open_store();
    let keys: Vec<String> = (0..3)
        .map(|_| format!("user-cache-test:{}", Uuid::new_v4()))
        .collect();
    let entries = vec![
        (keys[0].clone(), "a".to_string()),
        (keys[2].clone(), "c".to_string()),
    ];

    store.set_many(&entries, Some(30)).await.unwrap();
    let values = store.mget(&keys).await.unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0].as_deref(), Some(&b"a"[..]));
    assert_eq!(values[1], None);
    assert_eq!(values[2].as_deref(), Some(&b"c"[..]));
    store.close().await;
}

// == Typed Cache Tests ==

#[tokio::test]
#[ignore]
async fn test_uuid_to_id_round_trip() {
    let store = open_store();
    let cache = UuidToIdCache::new(store.clone());
    let uuid = Uuid::new_v4();

    cache.set(&uuid, &123).await.unwrap();

    assert_eq!(cache.get(&uuid).await, Some(123));
    let raw = store.get(&UuidToId::encode_key(&uuid)).await.unwrap();
    assert_eq!(raw.as_deref(), Some(&b"123"[..]));

    cache.invalidate(&uuid).await;
    assert_eq!(cache.get(&uuid).await, None);
    store.close().await;
}

#[tokio::test]
#[ignore]
async fn test_corrupt_entry_is_evicted() {
    let store = open_store();
    let cache = UuidToIdCache::new(store.clone());
    let uuid = Uuid::new_v4();
    let key = UuidToId::encode_key(&uuid);
    store.set(&key, "garbage", Some(30)).await.unwrap();

    assert_eq!(cache.get(&uuid).await, None);
    assert_eq!(store.get(&key).await.unwrap(), None);
    store.close().await;
}

#[tokio::test]
#[ignore]
async fn test_batch_round_trip_and_ceiling() {
    let store = open_store();
    let cache = UuidToIdCache::new(store.clone());
    let entries: HashMap<Uuid, i64> = (0..100).map(|i| (Uuid::new_v4(), i)).collect();
    let keys: Vec<Uuid> = entries.keys().copied().collect();

    cache.batch_set(&entries).await.unwrap();
    let read = cache.batch_get(&keys).await.unwrap();
    for (key, value) in &entries {
        assert_eq!(read[key], Some(*value));
    }

    let mut too_many = keys.clone();
    too_many.push(Uuid::new_v4());
    assert_eq!(
        cache.batch_get(&too_many).await,
        Err(CacheError::Validation {
            requested: 101,
            limit: 100
        })
    );

    for key in &keys {
        cache.invalidate(key).await;
    }
    store.close().await;
}

// == Connection Manager Tests ==

#[tokio::test]
#[ignore]
async fn test_manager_lifecycle() {
    let manager = connected_manager().await;

    assert_eq!(manager.state().await, ConnectionState::Connected);
    assert_eq!(manager.health().await, HealthStatus::Healthy);
    assert!(manager.uuid_to_id_cache().await.is_some());

    manager.disconnect().await;
    assert_eq!(manager.health().await, HealthStatus::Unavailable);
    assert!(manager.uuid_to_id_cache().await.is_none());
}

#[tokio::test]
#[ignore]
async fn test_connect_to_unreachable_store_fails() {
    let manager = ConnectionManager::new(
        Arc::new(RedisConnector::new(
            "redis://127.0.0.1:1",
            ConnectionSettings::default(),
        )),
        ConnectionSettings::default(),
    );

    let result = manager.connect().await;

    assert!(matches!(result, Err(CacheError::Connection(_))));
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}
