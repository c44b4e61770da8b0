// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pettrail::error::{AppError, ErrorKind};
use serde_json::Value;
use uuid::Uuid;

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_error_kinds() {
    let id = Uuid::new_v4();
    assert_eq!(AppError::PetNotFound(id).kind(), ErrorKind::NotFound);
    assert_eq!(AppError::WalkNotFound(id).kind(), ErrorKind::NotFound);
    assert_eq!(AppError::NoActiveWalk(id).kind(), ErrorKind::NotFound);
    assert_eq!(AppError::ActiveWalkExists(id).kind(), ErrorKind::Conflict);
    assert_eq!(AppError::WalkFinished(id).kind(), ErrorKind::Conflict);
    assert_eq!(
        AppError::BadRequest("x".to_string()).kind(),
        ErrorKind::Validation
    );
    assert_eq!(AppError::InvalidToken.kind(), ErrorKind::Unauthorized);
    assert_eq!(
        AppError::Database("down".to_string()).kind(),
        ErrorKind::Internal
    );
}

#[test]
fn test_entity_id() {
    let id = Uuid::new_v4();
    assert_eq!(AppError::WalkFinished(id).entity_id(), Some(id));
    assert_eq!(AppError::ActiveWalkExists(id).entity_id(), Some(id));
    assert_eq!(AppError::Unauthorized.entity_id(), None);
}

#[tokio::test]
async fn test_conflict_response_body() {
    let id = Uuid::new_v4();
    let (status, body) = render(AppError::WalkFinished(id)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "walk_finished");
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["details"], format!("Walk {} already finished", id));
}

#[tokio::test]
async fn test_no_active_walk_names_the_pet() {
    let pet_id = Uuid::new_v4();
    let (status, body) = render(AppError::NoActiveWalk(pet_id)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_active_walk");
    assert_eq!(body["id"], pet_id.to_string());
    assert_eq!(body["details"], format!("No active walk for pet {}", pet_id));
}

#[tokio::test]
async fn test_internal_details_not_leaked() {
    let (status, body) = render(AppError::Database("connection reset by peer".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = render(anyhow::anyhow!("secret stack").into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_bad_request_keeps_message() {
    let (status, body) =
        render(AppError::BadRequest("Payload must have 1..5000 points.".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Payload must have 1..5000 points.");
    assert!(body.get("id").is_none());
}
