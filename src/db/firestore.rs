// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed `WalkStore`.
//!
//! Every state change is one transaction whose reads run inside it, so
//! concurrent writers on other instances conflict at commit time:
//! - `active_walks/{pet_id}` exists while the pet has an active walk and is
//!   written together with the walk document
//! - `walk_finishes/{walk_id}` is created (must-not-exist) in the same
//!   commit that finishes the walk and drops the active marker
//! - each accepted ingest batch is one `walk_point_batches` document with a
//!   per-walk sequence number taken from `walk_point_counters/{walk_id}`

use crate::db::{collections, WalkStore};
use crate::error::AppError;
use crate::models::{Pet, Walk, WalkCompletion, WalkPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreTransaction, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker document: the pet currently has this active walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActiveWalkMarker {
    pet_id: Uuid,
    walk_id: Uuid,
}

/// Marker document: the walk has been finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalkFinishMarker {
    walk_id: Uuid,
    #[serde(with = "firestore::serialize_as_timestamp")]
    finished_at: DateTime<Utc>,
}

/// One ingest batch worth of accepted points.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PointBatch {
    walk_id: Uuid,
    /// Position of this batch among the walk's batches, from 0
    seq: u64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    stored_at: DateTime<Utc>,
    points: Vec<WalkPoint>,
}

/// Next batch sequence number for a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PointBatchCounter {
    walk_id: Uuid,
    next_seq: u64,
}

fn batch_doc_id(walk_id: Uuid, seq: u64) -> String {
    format!("{}-{:08}", walk_id, seq)
}

/// Give up on a transaction and report `err`.
async fn abort<T>(transaction: FirestoreTransaction<'_>, err: AppError) -> Result<T, AppError> {
    let _ = transaction.rollback().await;
    Err(err)
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Begin a transaction plus a client view whose reads run inside it.
    async fn begin(
        &self,
    ) -> Result<(firestore::FirestoreDb, FirestoreTransaction<'_>), AppError> {
        let client = self.get_client()?;
        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );
        Ok((reader, transaction))
    }

    async fn read_walk(
        reader: &firestore::FirestoreDb,
        walk_id: Uuid,
    ) -> Result<Option<Walk>, AppError> {
        reader
            .fluent()
            .select()
            .by_id_in(collections::WALKS)
            .obj()
            .one(&walk_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn read_active_marker(
        reader: &firestore::FirestoreDb,
        pet_id: Uuid,
    ) -> Result<Option<ActiveWalkMarker>, AppError> {
        reader
            .fluent()
            .select()
            .by_id_in(collections::ACTIVE_WALKS)
            .obj()
            .one(&pet_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Map a failed commit on a walk to the state another writer left it in.
    async fn walk_commit_error(&self, walk_id: Uuid, e: impl std::fmt::Display) -> AppError {
        match self.get_walk(walk_id).await {
            Ok(None) => AppError::WalkNotFound(walk_id),
            Ok(Some(walk)) if !walk.is_active() => AppError::WalkFinished(walk_id),
            _ => AppError::Database(format!("Transaction commit failed: {}", e)),
        }
    }
}

#[async_trait]
impl WalkStore for FirestoreDb {
    fn backend_name(&self) -> &'static str {
        "firestore"
    }

    // ─── Pet Operations ──────────────────────────────────────────

    async fn get_pet(&self, pet_id: Uuid) -> Result<Option<Pet>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PETS)
            .obj()
            .one(&pet_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_pet(&self, pet: &Pet) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PETS)
            .document_id(pet.id.to_string())
            .object(pet)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_pet(&self, pet: &Pet) -> Result<(), AppError> {
        let updated: Result<Pet, FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PETS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(pet.id.to_string())
            .object(pet)
            .execute()
            .await;

        match updated {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataNotFoundError(_)) => Err(AppError::PetNotFound(pet.id)),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn delete_pet(&self, pet_id: Uuid) -> Result<(), AppError> {
        let client = self.get_client()?;
        let (reader, mut transaction) = self.begin().await?;

        let pet: Option<Pet> = reader
            .fluent()
            .select()
            .by_id_in(collections::PETS)
            .obj()
            .one(&pet_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if pet.is_none() {
            return abort(transaction, AppError::PetNotFound(pet_id)).await;
        }
        if Self::read_active_marker(&reader, pet_id).await?.is_some() {
            return abort(transaction, AppError::ActiveWalkExists(pet_id)).await;
        }

        client
            .fluent()
            .delete()
            .from(collections::PETS)
            .document_id(pet_id.to_string())
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add pet to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            return Err(match self.get_active_walk(pet_id).await {
                Ok(Some(_)) => AppError::ActiveWalkExists(pet_id),
                _ => AppError::Database(format!("Transaction commit failed: {}", e)),
            });
        }
        Ok(())
    }

    async fn list_pets_for_owner(&self, owner_id: Uuid) -> Result<Vec<Pet>, AppError> {
        let owner = owner_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PETS)
            .filter(move |q| q.field("owner_id").eq(owner.clone()))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Walk Lifecycle ──────────────────────────────────────────

    async fn insert_active_walk(&self, walk: &Walk) -> Result<(), AppError> {
        let client = self.get_client()?;
        let pet_doc_id = walk.pet_id.to_string();
        let (reader, mut transaction) = self.begin().await?;

        if Self::read_active_marker(&reader, walk.pet_id).await?.is_some() {
            return abort(transaction, AppError::ActiveWalkExists(walk.pet_id)).await;
        }

        // Marker and walk land in the same commit; the marker is create-only.
        let marker = ActiveWalkMarker {
            pet_id: walk.pet_id,
            walk_id: walk.id,
        };
        client
            .fluent()
            .update()
            .in_col(collections::ACTIVE_WALKS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&pet_doc_id)
            .object(&marker)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add active marker to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::WALKS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(walk.id.to_string())
            .object(walk)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add walk to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            // Another instance claimed the pet between our read and commit
            return Err(match Self::read_active_marker(client, walk.pet_id).await {
                Ok(Some(m)) if m.walk_id != walk.id => AppError::ActiveWalkExists(walk.pet_id),
                _ => AppError::Database(format!("Transaction commit failed: {}", e)),
            });
        }

        Ok(())
    }

    async fn get_walk(&self, walk_id: Uuid) -> Result<Option<Walk>, AppError> {
        Self::read_walk(self.get_client()?, walk_id).await
    }

    async fn get_active_walk(&self, pet_id: Uuid) -> Result<Option<Walk>, AppError> {
        let Some(marker) = Self::read_active_marker(self.get_client()?, pet_id).await? else {
            return Ok(None);
        };

        Ok(self
            .get_walk(marker.walk_id)
            .await?
            .filter(|walk| walk.is_active()))
    }

    async fn list_walks_for_pet(
        &self,
        pet_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Walk>, u64), AppError> {
        let pet = pet_id.to_string();
        let walks: Vec<Walk> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WALKS)
            .filter(move |q| q.field("pet_id").eq(pet.clone()))
            .order_by([("started_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Pagination in memory: walks per pet are few
        let total = walks.len() as u64;
        let page = walks.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    // ─── Points ──────────────────────────────────────────────────

    async fn append_points(&self, walk_id: Uuid, points: &[WalkPoint]) -> Result<(), AppError> {
        let client = self.get_client()?;
        let walk_doc_id = walk_id.to_string();
        let (reader, mut transaction) = self.begin().await?;

        // Read inside the transaction: a finish committed elsewhere after
        // this read makes our commit fail instead of landing late points.
        match Self::read_walk(&reader, walk_id).await? {
            None => return abort(transaction, AppError::WalkNotFound(walk_id)).await,
            Some(walk) if !walk.is_active() => {
                return abort(transaction, AppError::WalkFinished(walk_id)).await
            }
            Some(_) => {}
        }

        let counter: Option<PointBatchCounter> = reader
            .fluent()
            .select()
            .by_id_in(collections::WALK_POINT_COUNTERS)
            .obj()
            .one(&walk_doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let seq = counter.map_or(0, |c| c.next_seq);

        let batch = PointBatch {
            walk_id,
            seq,
            stored_at: points
                .first()
                .map(|p| p.stored_at)
                .unwrap_or_else(Utc::now),
            points: points.to_vec(),
        };
        let next = PointBatchCounter {
            walk_id,
            next_seq: seq + 1,
        };

        client
            .fluent()
            .update()
            .in_col(collections::WALK_POINT_BATCHES)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(batch_doc_id(walk_id, seq))
            .object(&batch)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add point batch to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::WALK_POINT_COUNTERS)
            .document_id(&walk_doc_id)
            .object(&next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add batch counter to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            return Err(self.walk_commit_error(walk_id, e).await);
        }

        tracing::debug!(
            walk_id = %walk_id,
            seq,
            count = points.len(),
            "Stored point batch"
        );
        Ok(())
    }

    async fn get_points(&self, walk_id: Uuid) -> Result<Vec<WalkPoint>, AppError> {
        let walk = walk_id.to_string();
        let mut batches: Vec<PointBatch> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WALK_POINT_BATCHES)
            .filter(move |q| q.field("walk_id").eq(walk.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        batches.sort_by_key(|b| b.seq);

        let mut points: Vec<WalkPoint> = batches.into_iter().flat_map(|b| b.points).collect();
        // Stable: equal timestamps stay in storage order
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    // ─── Finish ──────────────────────────────────────────────────

    async fn finish_walk(
        &self,
        walk_id: Uuid,
        completion: &WalkCompletion,
    ) -> Result<Walk, AppError> {
        let client = self.get_client()?;
        let walk_doc_id = walk_id.to_string();
        let (reader, mut transaction) = self.begin().await?;

        let walk = match Self::read_walk(&reader, walk_id).await? {
            None => return abort(transaction, AppError::WalkNotFound(walk_id)).await,
            Some(walk) if !walk.is_active() => {
                return abort(transaction, AppError::WalkFinished(walk_id)).await
            }
            Some(walk) => walk,
        };
        let finished = walk.complete(completion);

        // Metrics, pet release and the create-only finish marker commit together.
        client
            .fluent()
            .update()
            .in_col(collections::WALKS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(&walk_doc_id)
            .object(&finished)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add walk to transaction: {}", e)))?;

        client
            .fluent()
            .delete()
            .from(collections::ACTIVE_WALKS)
            .document_id(finished.pet_id.to_string())
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add active marker deletion to transaction: {}",
                    e
                ))
            })?;

        let marker = WalkFinishMarker {
            walk_id,
            finished_at: completion.finished_at,
        };
        client
            .fluent()
            .update()
            .in_col(collections::WALK_FINISHES)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&walk_doc_id)
            .object(&marker)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add finish marker to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            return Err(self.walk_commit_error(walk_id, e).await);
        }

        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_offline_client_reports_database_error() {
        let db = FirestoreDb::new_mock();
        let walk = Walk::start(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2025, 8, 14, 22, 0, 0).unwrap(),
        );

        assert!(matches!(
            db.get_walk(walk.id).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            db.insert_active_walk(&walk).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            db.append_points(walk.id, &[]).await,
            Err(AppError::Database(_))
        ));
        assert_eq!(db.backend_name(), "firestore");
    }

    #[test]
    fn test_batch_doc_ids_sort_by_sequence() {
        let walk_id = Uuid::new_v4();
        let mut ids: Vec<String> = [10, 2, 0, 1]
            .iter()
            .map(|&seq| batch_doc_id(walk_id, seq))
            .collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                batch_doc_id(walk_id, 0),
                batch_doc_id(walk_id, 1),
                batch_doc_id(walk_id, 2),
                batch_doc_id(walk_id, 10),
            ]
        );
    }
}
