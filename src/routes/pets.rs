// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pet registry routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Pet;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pets", get(list_pets).post(create_pet))
        .route(
            "/api/pets/{pet_id}",
            get(get_pet).put(update_pet).delete(delete_pet),
        )
}

#[derive(Deserialize, Validate)]
pub struct CreatePetRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1..100 characters"))]
    pub name: String,
    #[validate(length(max = 50))]
    pub species: Option<String>,
}

/// Partial update: absent fields keep their stored value.
#[derive(Deserialize, Validate)]
pub struct UpdatePetRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1..100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub species: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PetResponse {
    pub id: Uuid,
    pub name: String,
    pub species: Option<String>,
    pub created_at: String,
}

impl From<Pet> for PetResponse {
    fn from(pet: Pet) -> Self {
        Self {
            id: pet.id,
            name: pet.name,
            species: pet.species,
            created_at: format_utc_rfc3339(pet.created_at),
        }
    }
}

async fn create_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<PetResponse>)> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be blank".to_string()));
    }

    let pet = Pet::new(user.user_id, req.name.trim(), req.species);
    state.store.insert_pet(&pet).await?;

    tracing::info!(pet_id = %pet.id, "Pet created");

    Ok((StatusCode::CREATED, Json(PetResponse::from(pet))))
}

/// The caller's pets, oldest first.
async fn list_pets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PetResponse>>> {
    let pets = state.store.list_pets_for_owner(user.user_id).await?;
    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}

async fn get_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<PetResponse>> {
    let pet = state.walks.owned_pet(user.user_id, pet_id).await?;
    Ok(Json(PetResponse::from(pet)))
}

async fn update_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(pet_id): Path<Uuid>,
    Json(req): Json<UpdatePetRequest>,
) -> Result<Json<PetResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut pet = state.walks.owned_pet(user.user_id, pet_id).await?;
    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be blank".to_string()));
        }
        pet.name = name.trim().to_string();
    }
    if let Some(species) = req.species {
        pet.species = Some(species);
    }
    state.store.update_pet(&pet).await?;

    tracing::info!(pet_id = %pet.id, "Pet updated");

    Ok(Json(PetResponse::from(pet)))
}

/// Remove a pet that is not out on a walk; its finished walks are kept.
async fn delete_pet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(pet_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.walks.delete_pet(user.user_id, pet_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
