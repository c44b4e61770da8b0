// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication and ownership tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use pettrail::middleware::auth::SESSION_COOKIE;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

mod common;
use common::{create_pet, send, start_walk};

#[tokio::test]
async fn test_missing_token_rejected() {
    let (app, _state, _clock) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _state, _clock) = common::create_test_app();
    let token = common::create_test_jwt(Uuid::new_v4(), b"some_other_key_of_enough_length!");

    let (status, body) = send(&app, "GET", "/api/pets", &token, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_cookie_auth() {
    let (app, state, _clock) = common::create_test_app();
    let token = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pets")
                .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pets_are_per_owner() {
    let (app, state, _clock) = common::create_test_app();
    let alice = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);
    let bob = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);

    create_pet(&app, &alice, "Rex").await;
    create_pet(&app, &alice, "Mia").await;

    let (_, pets) = send(&app, "GET", "/api/pets", &alice, None).await;
    assert_eq!(pets.as_array().unwrap().len(), 2);

    let (_, pets) = send(&app, "GET", "/api/pets", &bob, None).await;
    assert_eq!(pets, json!([]));
}

#[tokio::test]
async fn test_other_owners_walk_is_not_found() {
    let (app, state, _clock) = common::create_test_app();
    let alice = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);
    let bob = common::create_test_jwt(Uuid::new_v4(), &state.config.jwt_signing_key);

    let pet_id = create_pet(&app, &alice, "Rex").await;
    let walk_id = start_walk(&app, &alice, pet_id).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/walks/start",
        &bob,
        Some(json!({ "pet_id": pet_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "pet_not_found");

    for (method, uri, payload) in [
        ("POST", format!("/api/walks/{}/stop", walk_id), None),
        ("GET", format!("/api/walks/{}/geojson", walk_id), None),
        (
            "POST",
            format!("/api/walks/{}/points", walk_id),
            Some(json!([{ "lat": 0.0, "lon": 0.0, "ts": "2025-08-14T22:00:00Z" }])),
        ),
    ] {
        let (status, body) = send(&app, method, &uri, &bob, payload).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body["error"], "walk_not_found");
    }

    // Alice's walk is untouched
    let (status, _) = send(&app, "POST", &format!("/api/walks/{}/stop", walk_id), &alice, None).await;
    assert_eq!(status, StatusCode::OK);
}
