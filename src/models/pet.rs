//! Pet model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pet profile, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    /// Pet ID (also used as document ID)
    pub id: Uuid,
    /// Owning user ID
    pub owner_id: Uuid,
    pub name: String,
    /// Dog, cat, ...
    pub species: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Pet {
    pub fn new(owner_id: Uuid, name: impl Into<String>, species: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            species,
            created_at: Utc::now(),
        }
    }
}
