// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS batch ingestion.
//!
//! Each batch is handled on its own:
//! 1. Stable sort by timestamp (equal timestamps keep submission order)
//! 2. Accept the first point unconditionally
//! 3. Discard points not strictly later than the last accepted one
//! 4. Discard points implying more than 50 m/s from the last accepted one
//! 5. Store the accepted subset in one write
//!
//! The "last accepted" point is not seeded from earlier batches.

use crate::db::WalkStore;
use crate::error::{AppError, Result};
use crate::models::{RawPoint, WalkPoint};
use crate::services::distance::distance;
use crate::services::locks::KeyedLocks;
use crate::time_utils::Clock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Implied speed above which a point is an outlier (180 km/h).
pub const SPEED_THRESHOLD_MPS: f64 = 50.0;

/// Largest batch a client may submit.
pub const MAX_BATCH_POINTS: usize = 5000;

/// Why a point was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NonIncreasingTimestamp,
    SpeedOutlier,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::NonIncreasingTimestamp => write!(f, "non-increasing timestamp"),
            DiscardReason::SpeedOutlier => write!(f, "speed outlier"),
        }
    }
}

/// Result of filtering one batch, in acceptance order.
#[derive(Debug, Default)]
pub struct FilteredBatch<'a> {
    pub accepted: Vec<&'a RawPoint>,
    pub discarded: Vec<(&'a RawPoint, DiscardReason)>,
}

/// Sort and filter a batch without touching storage.
pub fn filter_batch(raw_points: &[RawPoint]) -> FilteredBatch<'_> {
    let mut sorted: Vec<&RawPoint> = raw_points.iter().collect();
    // sort_by_key is stable
    sorted.sort_by_key(|p| p.timestamp);

    let mut batch = FilteredBatch::default();
    let mut last_accepted: Option<&RawPoint> = None;

    for point in sorted {
        let Some(last) = last_accepted else {
            batch.accepted.push(point);
            last_accepted = Some(point);
            continue;
        };

        // Whole seconds, truncated: sub-second steps count as non-increasing
        let dt = point
            .timestamp
            .signed_duration_since(last.timestamp)
            .num_seconds();
        if dt <= 0 {
            batch
                .discarded
                .push((point, DiscardReason::NonIncreasingTimestamp));
            continue;
        }

        let speed = distance(last, point) / dt as f64;
        if speed > SPEED_THRESHOLD_MPS {
            batch.discarded.push((point, DiscardReason::SpeedOutlier));
            continue;
        }

        batch.accepted.push(point);
        last_accepted = Some(point);
    }

    batch
}

/// Counts returned for an ingested batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IngestSummary {
    pub received: usize,
    pub accepted: usize,
    pub discarded: usize,
}

/// Accepts GPS batches for active walks.
#[derive(Clone)]
pub struct TrajectoryIngestionEngine {
    store: Arc<dyn WalkStore>,
    walk_locks: KeyedLocks,
    clock: Arc<dyn Clock>,
}

impl TrajectoryIngestionEngine {
    /// `walk_locks` must be shared with the lifecycle manager so that
    /// ingest and stop for one walk never interleave.
    pub fn new(store: Arc<dyn WalkStore>, walk_locks: KeyedLocks, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            walk_locks,
            clock,
        }
    }

    /// Filter a batch and store the accepted points.
    ///
    /// Size limits are checked by the caller. Nothing is stored on error.
    pub async fn ingest(&self, walk_id: Uuid, raw_points: &[RawPoint]) -> Result<IngestSummary> {
        let _guard = self.walk_locks.lock(walk_id).await;

        let walk = self
            .store
            .get_walk(walk_id)
            .await?
            .ok_or(AppError::WalkNotFound(walk_id))?;
        if !walk.is_active() {
            return Err(AppError::WalkFinished(walk_id));
        }

        let batch = filter_batch(raw_points);

        for (point, reason) in &batch.discarded {
            tracing::debug!(
                walk_id = %walk_id,
                reason = %reason,
                lat = point.latitude,
                lon = point.longitude,
                ts = %point.timestamp,
                "Discarded point"
            );
        }

        let stored_at = self.clock.now();
        let points: Vec<WalkPoint> = batch
            .accepted
            .iter()
            .map(|raw| WalkPoint::accept(walk_id, raw, stored_at))
            .collect();

        if !points.is_empty() {
            self.store.append_points(walk_id, &points).await?;
        }

        let summary = IngestSummary {
            received: raw_points.len(),
            accepted: points.len(),
            discarded: raw_points.len() - points.len(),
        };

        tracing::info!(
            walk_id = %walk_id,
            received = summary.received,
            accepted = summary.accepted,
            discarded = summary.discarded,
            "Walk points batch processed"
        );

        Ok(summary)
    }
}
