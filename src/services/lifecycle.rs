// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk lifecycle: start, stop and read access to an owner's walks,
//! plus pet removal, which must not race a start.
//!
//! State machine: `Active -> Finished`, nothing else. The storage layer
//! enforces one active walk per pet and finish-exactly-once; the per-key
//! locks here keep same-process callers from even reaching those races.

use crate::db::WalkStore;
use crate::error::{AppError, Result};
use crate::models::{Pet, Walk, WalkCompletion, WalkPoint};
use crate::services::locks::KeyedLocks;
use crate::services::{metrics, route};
use crate::time_utils::Clock;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of walks, newest first.
#[derive(Debug, Clone)]
pub struct WalkPage {
    pub walks: Vec<Walk>,
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
    pub total_elements: u64,
}

/// Owns walk state transitions.
#[derive(Clone)]
pub struct WalkLifecycleManager {
    store: Arc<dyn WalkStore>,
    walk_locks: KeyedLocks,
    pet_locks: KeyedLocks,
    clock: Arc<dyn Clock>,
}

impl WalkLifecycleManager {
    pub fn new(store: Arc<dyn WalkStore>, walk_locks: KeyedLocks, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            walk_locks,
            pet_locks: KeyedLocks::new(),
            clock,
        }
    }

    /// The pet if it exists and belongs to `owner_id`.
    pub async fn owned_pet(&self, owner_id: Uuid, pet_id: Uuid) -> Result<Pet> {
        self.store
            .get_pet(pet_id)
            .await?
            .filter(|pet| pet.owner_id == owner_id)
            .ok_or(AppError::PetNotFound(pet_id))
    }

    /// The walk if it exists and belongs to `owner_id`.
    pub async fn owned_walk(&self, owner_id: Uuid, walk_id: Uuid) -> Result<Walk> {
        self.store
            .get_walk(walk_id)
            .await?
            .filter(|walk| walk.owner_id == owner_id)
            .ok_or(AppError::WalkNotFound(walk_id))
    }

    /// Start a walk for a pet.
    ///
    /// Fails with `PetNotFound` or `ActiveWalkExists`.
    pub async fn start_walk(&self, owner_id: Uuid, pet_id: Uuid) -> Result<Walk> {
        let _guard = self.pet_locks.lock(pet_id).await;

        self.owned_pet(owner_id, pet_id).await?;

        let walk = Walk::start(pet_id, owner_id, self.clock.now());
        self.store.insert_active_walk(&walk).await?;

        tracing::info!(
            walk_id = %walk.id,
            pet_id = %pet_id,
            started_at = %walk.started_at,
            "Walk started"
        );

        Ok(walk)
    }

    /// Delete a pet that has no active walk.
    ///
    /// Holds the pet's lock so a concurrent start cannot slip in between
    /// the ownership check and the delete.
    pub async fn delete_pet(&self, owner_id: Uuid, pet_id: Uuid) -> Result<()> {
        let _guard = self.pet_locks.lock(pet_id).await;

        self.owned_pet(owner_id, pet_id).await?;
        self.store.delete_pet(pet_id).await?;

        tracing::info!(pet_id = %pet_id, "Pet deleted");
        Ok(())
    }

    /// Stop an active walk and store its metrics.
    ///
    /// Fails with `WalkNotFound` or `WalkFinished`; a failed stop leaves
    /// the walk untouched.
    pub async fn stop_walk(&self, walk_id: Uuid) -> Result<Walk> {
        let _guard = self.walk_locks.lock(walk_id).await;

        let walk = self
            .store
            .get_walk(walk_id)
            .await?
            .ok_or(AppError::WalkNotFound(walk_id))?;
        if !walk.is_active() {
            return Err(AppError::WalkFinished(walk_id));
        }

        let points = self.store.get_points(walk_id).await?;
        let finished_at = self.clock.now();
        let completion = WalkCompletion {
            finished_at,
            metrics: metrics::compute(&points, walk.started_at, finished_at),
        };

        let finished = self.store.finish_walk(walk_id, &completion).await?;

        tracing::info!(
            walk_id = %walk_id,
            points = points.len(),
            distance_meters = completion.metrics.distance_meters,
            duration_seconds = completion.metrics.duration_seconds,
            avg_speed_kmh = completion.metrics.avg_speed_kmh,
            "Walk finished"
        );

        Ok(finished)
    }

    /// The pet's active walk, if any.
    pub async fn active_walk(&self, owner_id: Uuid, pet_id: Uuid) -> Result<Option<Walk>> {
        self.owned_pet(owner_id, pet_id).await?;
        self.store.get_active_walk(pet_id).await
    }

    /// A page of the pet's walks, newest first.
    pub async fn list_walks(
        &self,
        owner_id: Uuid,
        pet_id: Uuid,
        page: u32,
        size: u32,
    ) -> Result<WalkPage> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(AppError::BadRequest(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        self.owned_pet(owner_id, pet_id).await?;

        let offset = page as usize * size as usize;
        let (walks, total_elements) = self
            .store
            .list_walks_for_pet(pet_id, offset, size as usize)
            .await?;

        Ok(WalkPage {
            walks,
            page,
            size,
            total_pages: total_elements.div_ceil(size as u64),
            total_elements,
        })
    }

    /// Accepted points of an owned walk, in timestamp order.
    pub async fn points(&self, owner_id: Uuid, walk_id: Uuid) -> Result<Vec<WalkPoint>> {
        self.owned_walk(owner_id, walk_id).await?;
        self.store.get_points(walk_id).await
    }

    /// The walk's route as a GeoJSON feature.
    pub async fn route(&self, owner_id: Uuid, walk_id: Uuid) -> Result<geojson::Feature> {
        let points = self.points(owner_id, walk_id).await?;
        Ok(route::route_feature(walk_id, &points))
    }
}
