// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk routes: lifecycle, point ingestion, history and route export.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{RawPoint, Walk};
use crate::services::ingestion::MAX_BATCH_POINTS;
use crate::services::lifecycle::DEFAULT_PAGE_SIZE;
use crate::services::IngestSummary;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Walk routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/walks", get(list_walks))
        .route("/api/walks/start", post(start_walk))
        .route("/api/walks/active", get(get_active_walk))
        .route("/api/walks/{walk_id}/points", post(post_points))
        .route("/api/walks/{walk_id}/stop", post(stop_walk))
        .route("/api/walks/{walk_id}/geojson", get(get_geojson))
}

// ─── Start / Active ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct StartWalkRequest {
    pub pet_id: Uuid,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StartWalkResponse {
    pub walk_id: Uuid,
    pub started_at: String,
}

impl From<&Walk> for StartWalkResponse {
    fn from(walk: &Walk) -> Self {
        Self {
            walk_id: walk.id,
            started_at: format_utc_rfc3339(walk.started_at),
        }
    }
}

async fn start_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<StartWalkRequest>,
) -> Result<Json<StartWalkResponse>> {
    let walk = state.walks.start_walk(user.user_id, req.pet_id).await?;
    Ok(Json(StartWalkResponse::from(&walk)))
}

#[derive(Deserialize)]
pub struct PetQuery {
    pub pet_id: Uuid,
}

/// The pet's active walk, or 404 when there is none.
async fn get_active_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PetQuery>,
) -> Result<Json<StartWalkResponse>> {
    let walk = state
        .walks
        .active_walk(user.user_id, query.pet_id)
        .await?
        .ok_or(AppError::NoActiveWalk(query.pet_id))?;
    Ok(Json(StartWalkResponse::from(&walk)))
}

// ─── Points ──────────────────────────────────────────────────

/// Check batch size and per-point ranges.
pub fn validate_points(points: &[RawPoint]) -> Result<()> {
    if points.is_empty() || points.len() > MAX_BATCH_POINTS {
        return Err(AppError::BadRequest(format!(
            "Payload must have 1..{} points.",
            MAX_BATCH_POINTS
        )));
    }
    for (i, point) in points.iter().enumerate() {
        point
            .validate()
            .map_err(|e| AppError::BadRequest(format!("points[{}]: {}", i, e)))?;
    }
    Ok(())
}

async fn post_points(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(walk_id): Path<Uuid>,
    payload: std::result::Result<Json<Vec<RawPoint>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestSummary>)> {
    let Json(points) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    validate_points(&points)?;

    state.walks.owned_walk(user.user_id, walk_id).await?;
    let summary = state.ingestion.ingest(walk_id, &points).await?;

    Ok((StatusCode::ACCEPTED, Json(summary)))
}

// ─── Stop ────────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StopWalkResponse {
    pub walk_id: Uuid,
    pub distance_meters: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_seconds: i64,
    pub avg_speed_kmh: f64,
    pub started_at: String,
    pub finished_at: String,
}

async fn stop_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(walk_id): Path<Uuid>,
) -> Result<Json<StopWalkResponse>> {
    state.walks.owned_walk(user.user_id, walk_id).await?;
    let walk = state.walks.stop_walk(walk_id).await?;

    let (Some(finished_at), Some(metrics)) = (walk.finished_at, walk.metrics()) else {
        return Err(anyhow::anyhow!("walk {} stored without completion", walk_id).into());
    };

    Ok(Json(StopWalkResponse {
        walk_id,
        distance_meters: metrics.distance_meters,
        duration_seconds: metrics.duration_seconds,
        avg_speed_kmh: metrics.avg_speed_kmh,
        started_at: format_utc_rfc3339(walk.started_at),
        finished_at: format_utc_rfc3339(finished_at),
    }))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListWalksQuery {
    pub pet_id: Uuid,
    #[serde(default)]
    pub page: u32,
    pub size: Option<u32>,
}

/// Walk list item.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WalkSummary {
    pub walk_id: Uuid,
    pub pet_id: Uuid,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub distance_meters: Option<f64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub duration_seconds: Option<i64>,
    pub avg_speed_kmh: Option<f64>,
}

impl From<Walk> for WalkSummary {
    fn from(walk: Walk) -> Self {
        Self {
            walk_id: walk.id,
            pet_id: walk.pet_id,
            started_at: format_utc_rfc3339(walk.started_at),
            finished_at: walk.finished_at.map(format_utc_rfc3339),
            distance_meters: walk.distance_meters,
            duration_seconds: walk.duration_seconds,
            avg_speed_kmh: walk.avg_speed_kmh,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WalksPageResponse {
    pub content: Vec<WalkSummary>,
    pub page: u32,
    pub size: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_pages: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_elements: u64,
}

async fn list_walks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListWalksQuery>,
) -> Result<Json<WalksPageResponse>> {
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = state
        .walks
        .list_walks(user.user_id, query.pet_id, query.page, size)
        .await?;

    Ok(Json(WalksPageResponse {
        content: page.walks.into_iter().map(WalkSummary::from).collect(),
        page: page.page,
        size: page.size,
        total_pages: page.total_pages,
        total_elements: page.total_elements,
    }))
}

// ─── Route export ────────────────────────────────────────────

async fn get_geojson(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(walk_id): Path<Uuid>,
) -> Result<Json<geojson::Feature>> {
    let feature = state.walks.route(user.user_id, walk_id).await?;
    Ok(Json(feature))
}
