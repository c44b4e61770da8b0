// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! PetTrail: GPS walk tracking for pets
//!
//! This crate provides the backend API for starting and stopping walks,
//! ingesting batches of GPS samples, and computing trip metrics from the
//! accepted trajectory.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::WalkStore;
use services::{KeyedLocks, TrajectoryIngestionEngine, WalkLifecycleManager};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn WalkStore>,
    pub walks: WalkLifecycleManager,
    pub ingestion: TrajectoryIngestionEngine,
}

impl AppState {
    /// Wire the services around one store and clock.
    ///
    /// Lifecycle and ingestion share a single set of per-walk locks.
    pub fn new(config: Config, store: Arc<dyn WalkStore>, clock: Arc<dyn Clock>) -> Self {
        let walk_locks = KeyedLocks::new();
        Self {
            walks: WalkLifecycleManager::new(store.clone(), walk_locks.clone(), clock.clone()),
            ingestion: TrajectoryIngestionEngine::new(store.clone(), walk_locks, clock),
            store,
            config,
        }
    }
}
