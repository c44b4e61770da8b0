//! Database layer: the `WalkStore` seam and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Pet, Walk, WalkCompletion, WalkPoint};
use async_trait::async_trait;
use uuid::Uuid;

/// Collection names as constants.
pub mod collections {
    pub const PETS: &str = "pets";
    pub const WALKS: &str = "walks";
    /// One document per pet with an active walk (document ID = pet ID)
    pub const ACTIVE_WALKS: &str = "active_walks";
    /// One document per finished walk (document ID = walk ID)
    pub const WALK_FINISHES: &str = "walk_finishes";
    /// One document per accepted ingest batch (document ID = walk ID + sequence)
    pub const WALK_POINT_BATCHES: &str = "walk_point_batches";
    /// Next batch sequence number per walk (document ID = walk ID)
    pub const WALK_POINT_COUNTERS: &str = "walk_point_counters";
}

/// Transactional storage for pets, walks and accepted points.
///
/// Implementations enforce the walk invariants structurally:
/// `insert_active_walk` admits at most one active walk per pet and
/// `finish_walk` transitions a walk out of `Active` at most once.
#[async_trait]
pub trait WalkStore: Send + Sync {
    /// Short backend name for logging.
    fn backend_name(&self) -> &'static str;

    async fn get_pet(&self, pet_id: Uuid) -> Result<Option<Pet>, AppError>;

    async fn insert_pet(&self, pet: &Pet) -> Result<(), AppError>;

    /// Overwrite an existing pet. Fails with `PetNotFound` if it is gone.
    async fn update_pet(&self, pet: &Pet) -> Result<(), AppError>;

    /// Remove a pet.
    ///
    /// Fails with `PetNotFound`, or `ActiveWalkExists` while the pet is
    /// being walked. Finished walks stay in history.
    async fn delete_pet(&self, pet_id: Uuid) -> Result<(), AppError>;

    async fn list_pets_for_owner(&self, owner_id: Uuid) -> Result<Vec<Pet>, AppError>;

    /// Store a new active walk.
    ///
    /// Fails with `ActiveWalkExists` if the pet already has one.
    async fn insert_active_walk(&self, walk: &Walk) -> Result<(), AppError>;

    async fn get_walk(&self, walk_id: Uuid) -> Result<Option<Walk>, AppError>;

    async fn get_active_walk(&self, pet_id: Uuid) -> Result<Option<Walk>, AppError>;

    /// Walks for a pet, newest first, plus the total count.
    async fn list_walks_for_pet(
        &self,
        pet_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Walk>, u64), AppError>;

    /// Durably store one batch of accepted points, all or nothing.
    ///
    /// Fails with `WalkNotFound` / `WalkFinished` if the walk is not active.
    async fn append_points(&self, walk_id: Uuid, points: &[WalkPoint]) -> Result<(), AppError>;

    /// All accepted points of a walk in non-decreasing timestamp order.
    ///
    /// Points with equal timestamps keep the order they were stored in.
    async fn get_points(&self, walk_id: Uuid) -> Result<Vec<WalkPoint>, AppError>;

    /// Transition an active walk to finished and return the stored record.
    ///
    /// Fails with `WalkNotFound`, or `WalkFinished` if it already finished.
    async fn finish_walk(
        &self,
        walk_id: Uuid,
        completion: &WalkCompletion,
    ) -> Result<Walk, AppError>;
}
