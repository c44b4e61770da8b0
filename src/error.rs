// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("No active walk for pet {0}")]
    NoActiveWalk(Uuid),

    #[error("Pet not found: {0}")]
    PetNotFound(Uuid),

    #[error("Walk not found: {0}")]
    WalkNotFound(Uuid),

    #[error("Pet {0} already has an active walk")]
    ActiveWalkExists(Uuid),

    #[error("Walk {0} already finished")]
    WalkFinished(Uuid),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse error classification used by callers to build responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Unauthorized,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::PetNotFound(_)
            | AppError::WalkNotFound(_)
            | AppError::NoActiveWalk(_) => ErrorKind::NotFound,
            AppError::ActiveWalkExists(_) | AppError::WalkFinished(_) => ErrorKind::Conflict,
            AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::Unauthorized | AppError::InvalidToken => ErrorKind::Unauthorized,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The pet or walk the error refers to, if any.
    pub fn entity_id(&self) -> Option<Uuid> {
        match self {
            AppError::PetNotFound(id)
            | AppError::WalkNotFound(id)
            | AppError::NoActiveWalk(id)
            | AppError::ActiveWalkExists(id)
            | AppError::WalkFinished(id) => Some(*id),
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let id = self.entity_id();
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::PetNotFound(_) => (
                StatusCode::NOT_FOUND,
                "pet_not_found",
                Some(self.to_string()),
            ),
            AppError::WalkNotFound(_) => (
                StatusCode::NOT_FOUND,
                "walk_not_found",
                Some(self.to_string()),
            ),
            AppError::NoActiveWalk(_) => (
                StatusCode::NOT_FOUND,
                "no_active_walk",
                Some(self.to_string()),
            ),
            AppError::ActiveWalkExists(_) => (
                StatusCode::CONFLICT,
                "active_walk_exists",
                Some(self.to_string()),
            ),
            AppError::WalkFinished(_) => (
                StatusCode::CONFLICT,
                "walk_finished",
                Some(self.to_string()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
