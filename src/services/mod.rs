// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - walk tracking logic.

pub mod distance;
pub mod ingestion;
pub mod lifecycle;
pub mod locks;
pub mod metrics;
pub mod route;

pub use ingestion::{IngestSummary, TrajectoryIngestionEngine};
pub use lifecycle::{WalkLifecycleManager, WalkPage};
pub use locks::KeyedLocks;
