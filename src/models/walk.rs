// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Walk model: one tracked outing and its lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a walk. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkState {
    Active,
    Finished,
}

/// Stored walk record.
///
/// `finished_at` is `None` exactly while the walk is active; the three
/// metric fields are written together with it when the walk stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walk {
    /// Walk ID (also used as document ID)
    pub id: Uuid,
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    /// Server time at start
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub started_at: DateTime<Utc>,
    /// Server time at stop
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub avg_speed_kmh: Option<f64>,
}

/// Consolidated trip metrics, computed once at stop time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkMetrics {
    pub distance_meters: f64,
    pub duration_seconds: i64,
    pub avg_speed_kmh: f64,
}

/// Everything written when a walk transitions to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkCompletion {
    pub finished_at: DateTime<Utc>,
    pub metrics: WalkMetrics,
}

impl Walk {
    /// A new active walk with a fresh ID.
    pub fn start(pet_id: Uuid, owner_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pet_id,
            owner_id,
            started_at,
            finished_at: None,
            distance_meters: None,
            duration_seconds: None,
            avg_speed_kmh: None,
        }
    }

    pub fn state(&self) -> WalkState {
        if self.finished_at.is_some() {
            WalkState::Finished
        } else {
            WalkState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == WalkState::Active
    }

    /// Metrics of a finished walk.
    pub fn metrics(&self) -> Option<WalkMetrics> {
        Some(WalkMetrics {
            distance_meters: self.distance_meters?,
            duration_seconds: self.duration_seconds?,
            avg_speed_kmh: self.avg_speed_kmh?,
        })
    }

    /// Apply a completion to an active walk.
    pub fn complete(mut self, completion: &WalkCompletion) -> Self {
        self.finished_at = Some(completion.finished_at);
        self.distance_meters = Some(completion.metrics.distance_meters);
        self.duration_seconds = Some(completion.metrics.duration_seconds);
        self.avg_speed_kmh = Some(completion.metrics.avg_speed_kmh);
        self
    }
}
