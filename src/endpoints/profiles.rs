use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::prelude::*;
use crate::models::profile;
use crate::state::AppState;

/// Create profiles routes
pub fn profiles_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(create_profile))
        .route("/me", get(get_my_profile).patch(update_my_profile))
        .route("/{user_id}", get(get_profile))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(max = 255))]
    pub display_name: String,
    #[validate(length(max = 255))]
    pub field_of_study: Option<String>,
    #[validate(length(max = 255))]
    pub university: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 255))]
    pub display_name: Option<String>,
    #[validate(length(max = 255))]
    pub field_of_study: Option<String>,
    #[validate(length(max = 255))]
    pub university: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub display_name: String,
    pub field_of_study: Option<String>,
    pub university: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<profile::Model> for ProfileResponse {
    fn from(p: profile::Model) -> Self {
        Self {
            user_id: p.user_id,
            display_name: p.display_name,
            field_of_study: p.field_of_study,
            university: p.university,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// Create the caller's profile (exactly one per user)
async fn create_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<CreateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let display_name = data.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::BadRequest("Display name is required".to_string()));
    }

    // One profile per user
    let existing = Profile::find_by_id(auth_user.0.id).one(&state.db).await?;
    if existing.is_some() {
        return Err(AppError::Conflict("You already have a profile".to_string()));
    }

    let now = Utc::now();
    let new_profile = profile::ActiveModel {
        user_id: Set(auth_user.0.id),
        display_name: Set(display_name),
        field_of_study: Set(data.field_of_study),
        university: Set(data.university),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = new_profile.insert(&state.db).await?;
    Ok(Json(created.into()))
}

/// Get the caller's own profile
async fn get_my_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<ProfileResponse>> {
    let found = Profile::find_by_id(auth_user.0.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(found.into()))
}

/// Update the caller's profile
async fn update_my_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = Profile::find_by_id(auth_user.0.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let mut profile_model: profile::ActiveModel = existing.into();

    if let Some(display_name) = data.display_name {
        let display_name = display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AppError::BadRequest("Display name is required".to_string()));
        }
        profile_model.display_name = Set(display_name);
    }
    if let Some(field_of_study) = data.field_of_study {
        profile_model.field_of_study = Set(Some(field_of_study));
    }
    if let Some(university) = data.university {
        profile_model.university = Set(Some(university));
    }
    profile_model.updated_at = Set(Utc::now());

    let updated = profile_model.update(&state.db).await?;
    Ok(Json(updated.into()))
}

/// Get another user's profile by user id
async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ProfileResponse>> {
    let found = Profile::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(found.into()))
}
