use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::user;
use crate::services::security::decode_token;
use crate::services::{create_access_token, create_refresh_token, hash_password, verify_password};
use crate::state::AppState;

/// Create auth routes for account and token management
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

fn token_response(user: user::Model) -> Result<TokenResponse> {
    let access_token = create_access_token(&user.id.to_string(), Some(&user.email), None)?;
    let refresh_token = create_refresh_token(&user.id.to_string(), Some(&user.email))?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
        user_id: user.id,
        username: user.username,
        email: user.email,
    })
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// Register a new account, returns a token pair
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Check if username exists
    let existing = User::find()
        .filter(user::Column::Username.eq(&request.username))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest("Username already exists".to_string()));
    }

    // Check if email exists
    let existing = User::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest("Email already exists".to_string()));
    }

    let hashed = hash_password(&request.password)?;
    let now = Utc::now();

    let new_user = user::ActiveModel {
        username: Set(request.username),
        email: Set(request.email),
        hashed_password: Set(hashed),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created_user = new_user.insert(&state.db).await?;
    tracing::info!(user_id = created_user.id, "New account registered");

    Ok(Json(token_response(created_user)?))
}

/// Login with username or email and password, returns a token pair
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    // Find user by username or email
    let found_user = User::find()
        .filter(
            user::Column::Username
                .eq(&request.username)
                .or(user::Column::Email.eq(&request.username)),
        )
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !found_user.is_active {
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }

    // Verify password
    if !verify_password(&request.password, &found_user.hashed_password) {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    Ok(Json(token_response(found_user)?))
}

/// Exchange a refresh token for a fresh token pair
async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    let claims = decode_token(&request.refresh_token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))?;

    // Only refresh tokens may be exchanged here
    if claims.token_type.as_deref() != Some("refresh") {
        return Err(AppError::BadRequest(
            "Access tokens cannot be used to refresh a session".to_string(),
        ));
    }

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid session".to_string()))?;

    // Verify user still exists and is active
    let found_user = User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    Ok(Json(token_response(found_user)?))
}
