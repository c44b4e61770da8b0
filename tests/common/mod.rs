// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use pettrail::config::Config;
use pettrail::db::{FirestoreDb, MemoryDb};
use pettrail::middleware::auth::create_jwt;
use pettrail::routes::create_router;
use pettrail::time_utils::ManualClock;
use pettrail::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Fixed start time for deterministic walks.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 14, 22, 0, 0).unwrap()
}

/// Create a test app backed by the in-memory store and a manual clock.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let state = Arc::new(AppState::new(
        Config::default(),
        Arc::new(MemoryDb::new()),
        clock.clone(),
    ));
    (create_router(state.clone()), state, clock)
}

#[allow(dead_code)]
pub fn create_test_jwt(user_id: Uuid, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("Failed to create JWT")
}

/// Send a request with a bearer token and return status and JSON body.
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Create a pet over the API and return its ID.
#[allow(dead_code)]
pub async fn create_pet(app: &axum::Router, token: &str, name: &str) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/api/pets",
        token,
        Some(serde_json::json!({ "name": name, "species": "dog" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create pet failed: {}", body);
    body["id"].as_str().unwrap().parse().unwrap()
}

/// Start a walk over the API and return its ID.
#[allow(dead_code)]
pub async fn start_walk(app: &axum::Router, token: &str, pet_id: Uuid) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/api/walks/start",
        token,
        Some(serde_json::json!({ "pet_id": pet_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start walk failed: {}", body);
    body["walk_id"].as_str().unwrap().parse().unwrap()
}
