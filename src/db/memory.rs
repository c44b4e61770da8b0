//! Process-local `WalkStore`.
//!
//! All state lives behind one lock, so each operation is a single atomic
//! step: the active-walk index and the walk records never disagree.

use crate::db::WalkStore;
use crate::error::AppError;
use crate::models::{Pet, Walk, WalkCompletion, WalkPoint};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    pets: HashMap<Uuid, Pet>,
    walks: HashMap<Uuid, Walk>,
    /// pet ID -> active walk ID
    active_by_pet: HashMap<Uuid, Uuid>,
    /// walk ID -> points in storage order
    points: HashMap<Uuid, Vec<WalkPoint>>,
}

/// In-memory store, used for local runs and tests.
#[derive(Default)]
pub struct MemoryDb {
    state: RwLock<MemoryState>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalkStore for MemoryDb {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_pet(&self, pet_id: Uuid) -> Result<Option<Pet>, AppError> {
        Ok(self.state.read().await.pets.get(&pet_id).cloned())
    }

    async fn insert_pet(&self, pet: &Pet) -> Result<(), AppError> {
        self.state.write().await.pets.insert(pet.id, pet.clone());
        Ok(())
    }

    async fn update_pet(&self, pet: &Pet) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let stored = state
            .pets
            .get_mut(&pet.id)
            .ok_or(AppError::PetNotFound(pet.id))?;
        *stored = pet.clone();
        Ok(())
    }

    async fn delete_pet(&self, pet_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if !state.pets.contains_key(&pet_id) {
            return Err(AppError::PetNotFound(pet_id));
        }
        if state.active_by_pet.contains_key(&pet_id) {
            return Err(AppError::ActiveWalkExists(pet_id));
        }
        state.pets.remove(&pet_id);
        Ok(())
    }

    async fn list_pets_for_owner(&self, owner_id: Uuid) -> Result<Vec<Pet>, AppError> {
        let state = self.state.read().await;
        let mut pets: Vec<Pet> = state
            .pets
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        pets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pets)
    }

    async fn insert_active_walk(&self, walk: &Walk) -> Result<(), AppError> {
        let mut state = self.state.write().await;

        if state.active_by_pet.contains_key(&walk.pet_id) {
            return Err(AppError::ActiveWalkExists(walk.pet_id));
        }

        state.active_by_pet.insert(walk.pet_id, walk.id);
        state.walks.insert(walk.id, walk.clone());
        Ok(())
    }

    async fn get_walk(&self, walk_id: Uuid) -> Result<Option<Walk>, AppError> {
        Ok(self.state.read().await.walks.get(&walk_id).cloned())
    }

    async fn get_active_walk(&self, pet_id: Uuid) -> Result<Option<Walk>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .active_by_pet
            .get(&pet_id)
            .and_then(|walk_id| state.walks.get(walk_id))
            .cloned())
    }

    async fn list_walks_for_pet(
        &self,
        pet_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Walk>, u64), AppError> {
        let state = self.state.read().await;
        let mut walks: Vec<&Walk> = state.walks.values().filter(|w| w.pet_id == pet_id).collect();
        walks.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(a.id.cmp(&b.id)));

        let total = walks.len() as u64;
        let page = walks.into_iter().skip(offset).take(limit).cloned().collect();
        Ok((page, total))
    }

    async fn append_points(&self, walk_id: Uuid, points: &[WalkPoint]) -> Result<(), AppError> {
        let mut state = self.state.write().await;

        let walk = state
            .walks
            .get(&walk_id)
            .ok_or(AppError::WalkNotFound(walk_id))?;
        if !walk.is_active() {
            return Err(AppError::WalkFinished(walk_id));
        }

        state
            .points
            .entry(walk_id)
            .or_default()
            .extend_from_slice(points);
        Ok(())
    }

    async fn get_points(&self, walk_id: Uuid) -> Result<Vec<WalkPoint>, AppError> {
        let mut points = self
            .state
            .read()
            .await
            .points
            .get(&walk_id)
            .cloned()
            .unwrap_or_default();
        // Stable: equal timestamps stay in storage order
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    async fn finish_walk(
        &self,
        walk_id: Uuid,
        completion: &WalkCompletion,
    ) -> Result<Walk, AppError> {
        let mut state = self.state.write().await;

        let walk = state
            .walks
            .get(&walk_id)
            .cloned()
            .ok_or(AppError::WalkNotFound(walk_id))?;
        if !walk.is_active() {
            return Err(AppError::WalkFinished(walk_id));
        }

        let finished = walk.complete(completion);
        if state.active_by_pet.get(&finished.pet_id) == Some(&walk_id) {
            state.active_by_pet.remove(&finished.pet_id);
        }
        state.walks.insert(walk_id, finished.clone());
        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalkMetrics;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 14, 22, 0, 0).unwrap()
    }

    fn completion() -> WalkCompletion {
        WalkCompletion {
            finished_at: t0() + Duration::seconds(600),
            metrics: WalkMetrics {
                distance_meters: 800.0,
                duration_seconds: 600,
                avg_speed_kmh: 4.8,
            },
        }
    }

    fn point(walk_id: Uuid, lat: f64, seconds: i64) -> WalkPoint {
        WalkPoint {
            id: Uuid::new_v4(),
            walk_id,
            latitude: lat,
            longitude: 0.0,
            timestamp: t0() + Duration::seconds(seconds),
            elevation: None,
            stored_at: t0(),
        }
    }

    #[tokio::test]
    async fn test_second_active_walk_rejected() {
        let db = MemoryDb::new();
        let pet_id = Uuid::new_v4();
        let first = Walk::start(pet_id, Uuid::new_v4(), t0());
        let second = Walk::start(pet_id, first.owner_id, t0());

        db.insert_active_walk(&first).await.unwrap();
        let err = db.insert_active_walk(&second).await.unwrap_err();

        assert!(matches!(err, AppError::ActiveWalkExists(id) if id == pet_id));
        assert!(db.get_walk(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finish_is_compare_and_swap() {
        let db = MemoryDb::new();
        let walk = Walk::start(Uuid::new_v4(), Uuid::new_v4(), t0());
        db.insert_active_walk(&walk).await.unwrap();

        let finished = db.finish_walk(walk.id, &completion()).await.unwrap();
        assert!(!finished.is_active());
        assert!(db.get_active_walk(walk.pet_id).await.unwrap().is_none());

        let mut other = completion();
        other.metrics.distance_meters = 1.0;
        let err = db.finish_walk(walk.id, &other).await.unwrap_err();
        assert!(matches!(err, AppError::WalkFinished(_)));

        let stored = db.get_walk(walk.id).await.unwrap().unwrap();
        assert_eq!(stored.distance_meters, Some(800.0));
    }

    #[tokio::test]
    async fn test_finish_unknown_walk() {
        let db = MemoryDb::new();
        let err = db
            .finish_walk(Uuid::new_v4(), &completion())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WalkNotFound(_)));
    }

    #[tokio::test]
    async fn test_points_sorted_across_batches() {
        let db = MemoryDb::new();
        let walk = Walk::start(Uuid::new_v4(), Uuid::new_v4(), t0());
        db.insert_active_walk(&walk).await.unwrap();

        db.append_points(walk.id, &[point(walk.id, 1.0, 20), point(walk.id, 2.0, 30)])
            .await
            .unwrap();
        db.append_points(walk.id, &[point(walk.id, 3.0, 10), point(walk.id, 4.0, 20)])
            .await
            .unwrap();

        let lats: Vec<f64> = db
            .get_points(walk.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.latitude)
            .collect();
        assert_eq!(lats, vec![3.0, 1.0, 4.0, 2.0]);
    }

    #[tokio::test]
    async fn test_append_to_finished_walk_rejected() {
        let db = MemoryDb::new();
        let walk = Walk::start(Uuid::new_v4(), Uuid::new_v4(), t0());
        db.insert_active_walk(&walk).await.unwrap();
        db.finish_walk(walk.id, &completion()).await.unwrap();

        let err = db
            .append_points(walk.id, &[point(walk.id, 1.0, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WalkFinished(_)));
        assert!(db.get_points(walk.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_batch_order() {
        let db = MemoryDb::new();
        let walk = Walk::start(Uuid::new_v4(), Uuid::new_v4(), t0());
        db.insert_active_walk(&walk).await.unwrap();

        for lat in [1.0, 2.0, 3.0] {
            db.append_points(walk.id, &[point(walk.id, lat, 5)])
                .await
                .unwrap();
        }

        let lats: Vec<f64> = db
            .get_points(walk.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.latitude)
            .collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_delete_pet_blocked_while_walking() {
        let db = MemoryDb::new();
        let owner_id = Uuid::new_v4();
        let pet = Pet::new(owner_id, "Rex", None);
        db.insert_pet(&pet).await.unwrap();
        let walk = Walk::start(pet.id, owner_id, t0());
        db.insert_active_walk(&walk).await.unwrap();

        let err = db.delete_pet(pet.id).await.unwrap_err();
        assert!(matches!(err, AppError::ActiveWalkExists(id) if id == pet.id));

        db.finish_walk(walk.id, &completion()).await.unwrap();
        db.delete_pet(pet.id).await.unwrap();
        assert!(db.get_pet(pet.id).await.unwrap().is_none());
        assert!(db.get_walk(walk.id).await.unwrap().is_some());

        let err = db.delete_pet(pet.id).await.unwrap_err();
        assert!(matches!(err, AppError::PetNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_missing_pet_rejected() {
        let db = MemoryDb::new();
        let pet = Pet::new(Uuid::new_v4(), "Rex", None);
        let err = db.update_pet(&pet).await.unwrap_err();
        assert!(matches!(err, AppError::PetNotFound(id) if id == pet.id));
        assert!(db.get_pet(pet.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_walks_newest_first() {
        let db = MemoryDb::new();
        let pet_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();

        for i in 0..3 {
            let walk = Walk::start(pet_id, owner_id, t0() + Duration::hours(i));
            db.insert_active_walk(&walk).await.unwrap();
            db.finish_walk(walk.id, &completion()).await.unwrap();
        }

        let (page, total) = db.list_walks_for_pet(pet_id, 1, 5).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].started_at, t0() + Duration::hours(1));
        assert_eq!(page[1].started_at, t0());
    }
}
