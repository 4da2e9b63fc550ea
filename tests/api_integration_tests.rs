//! Integration Tests for API Endpoints
//!
//! Full request/response cycle for each endpoint over the in-process store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use user_cache::{
    api::create_router,
    cache::{KeySpace, UuidToId},
    config::ConnectionSettings,
    store::{MemoryConnector, MemoryStore, RemoteStore},
    users::SampleUserSource,
    AppState, ConnectionManager,
};

const JOHN: &str = "550e8400-e29b-41d4-a716-446655440001";
const JANE: &str = "550e8400-e29b-41d4-a716-446655440002";

// == Helper Functions ==

async fn create_test_app() -> (Router, AppState, Arc<MemoryConnector>) {
    let connector = Arc::new(MemoryConnector::new());
    let manager = ConnectionManager::new(connector.clone(), ConnectionSettings::default());
    manager.connect().await.unwrap();
    let state = AppState::new(manager, Arc::new(SampleUserSource::new()));
    (create_router(state.clone()), state, connector)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// == List Endpoint Tests ==

#[tokio::test]
async fn test_list_users() {
    let (app, state, _) = create_test_app().await;

    let response = app.oneshot(get("/users")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 10);
    assert_eq!(json["users"][0]["first_name"], "John");
    assert!(json["users"][0].get("id").is_none());
    state.manager.disconnect().await;
}

// == Single User Endpoint Tests ==

#[tokio::test]
async fn test_get_user_populates_cache() {
    let (app, state, connector) = create_test_app().await;

    let response = app.oneshot(get(&format!("/users/{JOHN}"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["uuid"], JOHN);
    assert_eq!(json["email"], "john.doe@example.com");

    let store = MemoryStore::with_backend(connector.backend().clone());
    let key = UuidToId::encode_key(&JOHN.parse().unwrap());
    let raw = store.get(&key).await.unwrap();
    assert_eq!(raw.as_deref(), Some(&b"1"[..]));
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_get_user_by_id() {
    let (app, state, _) = create_test_app().await;

    let response = app.oneshot(get("/users/id/2")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["uuid"], JANE);
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_get_user_not_found() {
    let (app, state, _) = create_test_app().await;

    let response = app
        .oneshot(get("/users/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("not found"));
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_get_user_invalid_uuid() {
    let (app, state, _) = create_test_app().await;

    let response = app.oneshot(get("/users/not-a-uuid")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_corrupt_entry_is_healed() {
    let (app, state, connector) = create_test_app().await;
    let store = MemoryStore::with_backend(connector.backend().clone());
    let key = UuidToId::encode_key(&JOHN.parse().unwrap());
    store.set(&key, "not-a-number", None).await.unwrap();

    let response = app.oneshot(get(&format!("/users/{JOHN}"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Evicted on read, then repopulated from the source.
    let raw = store.get(&key).await.unwrap();
    assert_eq!(raw.as_deref(), Some(&b"1"[..]));
    state.manager.disconnect().await;
}

// == Batch Lookup Endpoint Tests ==

#[tokio::test]
async fn test_batch_lookup() {
    let (app, state, _) = create_test_app().await;
    let unknown = "00000000-0000-0000-0000-000000000000";

    let response = app
        .oneshot(post_json(
            "/users/lookup",
            json!({ "uuids": [JOHN, unknown, JANE] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let users = json["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["uuid"], JOHN);
    assert_eq!(users[1]["uuid"], JANE);
    assert_eq!(json["missing"], json!([unknown]));
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_batch_lookup_at_limit() {
    let (app, state, _) = create_test_app().await;
    let uuids: Vec<String> = (0..100u128)
        .map(|n| uuid::Uuid::from_u128(n).to_string())
        .collect();

    let response = app
        .oneshot(post_json("/users/lookup", json!({ "uuids": uuids })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_batch_lookup_over_limit() {
    let (app, state, connector) = create_test_app().await;
    let uuids: Vec<String> = (0..101u128)
        .map(|n| uuid::Uuid::from_u128(n).to_string())
        .collect();
    let before = connector.backend().round_trips();

    let response = app
        .oneshot(post_json("/users/lookup", json!({ "uuids": uuids })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("101"));
    assert!(message.contains("100"));
    assert_eq!(connector.backend().round_trips(), before);
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_batch_lookup_malformed_body() {
    let (app, state, _) = create_test_app().await;

    let response = app
        .oneshot(post_json("/users/lookup", json!({ "ids": [1, 2] })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    state.manager.disconnect().await;
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_healthy() {
    let (app, state, _) = create_test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["connection"], "connected");
    assert_eq!(json["redis_connected"], true);
    assert!(json.get("timestamp").is_some());
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_health_degraded_when_store_unreachable() {
    let (app, state, connector) = create_test_app().await;
    connector.backend().set_reachable(false);

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "degraded");
    state.manager.disconnect().await;
}

#[tokio::test]
async fn test_health_unavailable_after_disconnect() {
    let (app, state, _) = create_test_app().await;
    state.manager.disconnect().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "unavailable");
    assert_eq!(json["connection"], "disconnected");
    assert_eq!(json["redis_connected"], false);
}

// == Degraded Operation ==

#[tokio::test]
async fn test_lookups_served_while_store_down() {
    let (app, state, connector) = create_test_app().await;
    connector.backend().set_reachable(false);

    let response = app
        .clone()
        .oneshot(get(&format!("/users/{JANE}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/users/lookup", json!({ "uuids": [JOHN] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["users"].as_array().unwrap().len(), 1);
    state.manager.disconnect().await;
}
