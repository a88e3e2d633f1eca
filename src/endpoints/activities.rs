use std::collections::HashMap;

use axum::{
    extract::{Extension, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::endpoints::places::{page_params, PageResponse, PlaceResponse};
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::prelude::*;
use crate::models::{activity, place};
use crate::state::AppState;

/// Create activities routes
pub fn activities_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_activities).post(create_activity))
        .route("/current", get(get_current_place))
        .route("/history", get(get_place_history))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActivityRequest {
    pub place_id: i64,
    #[validate(length(max = 2048))]
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: i64,
    pub place: PlaceResponse,
    pub photo_url: Option<String>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// A deduplicated entry in the place history
#[derive(Debug, Serialize)]
pub struct PlaceVisitResponse {
    pub place: PlaceResponse,
    pub last_seen_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Fetch the places referenced by a batch of activities, keyed by id
async fn load_places(
    state: &AppState,
    activities: &[activity::Model],
) -> Result<HashMap<i64, place::Model>> {
    let mut place_ids: Vec<i64> = activities.iter().map(|a| a.place_id).collect();
    place_ids.sort();
    place_ids.dedup();

    if place_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let places = Place::find()
        .filter(place::Column::Id.is_in(place_ids))
        .all(&state.db)
        .await?;

    Ok(places.into_iter().map(|p| (p.id, p)).collect())
}

fn to_response(a: activity::Model, places: &HashMap<i64, place::Model>) -> Result<ActivityResponse> {
    let place = places
        .get(&a.place_id)
        .cloned()
        .ok_or_else(|| AppError::Internal("Activity references a missing place".to_string()))?;

    Ok(ActivityResponse {
        id: a.id,
        place: place.into(),
        photo_url: a.photo_url,
        recorded_at: a.recorded_at,
    })
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// Record that the caller is at a place right now
async fn create_activity(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<CreateActivityRequest>,
) -> Result<Json<ActivityResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // The place must exist before anything is written
    let place = Place::find_by_id(data.place_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid place reference".to_string()))?;

    // Timestamp is assigned here, never taken from the client
    let new_activity = activity::ActiveModel {
        user_id: Set(auth_user.0.id),
        place_id: Set(data.place_id),
        photo_url: Set(data.photo_url),
        recorded_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = new_activity.insert(&state.db).await?;

    Ok(Json(ActivityResponse {
        id: created.id,
        place: place.into(),
        photo_url: created.photo_url,
        recorded_at: created.recorded_at,
    }))
}

/// List the caller's activities, newest first
async fn list_activities(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse<ActivityResponse>>> {
    let (page, per_page) = page_params(params.page, params.per_page);

    let paginator = Activity::find()
        .filter(activity::Column::UserId.eq(auth_user.0.id))
        .order_by_desc(activity::Column::RecordedAt)
        .order_by_desc(activity::Column::Id)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let activities = paginator.fetch_page(page - 1).await?;

    let places = load_places(&state, &activities).await?;
    let mut items = Vec::with_capacity(activities.len());
    for a in activities {
        items.push(to_response(a, &places)?);
    }

    Ok(Json(PageResponse::new(items, total, page, per_page)))
}

/// The caller's current place: the place of their latest activity
async fn get_current_place(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<ActivityResponse>> {
    let latest = Activity::find()
        .filter(activity::Column::UserId.eq(auth_user.0.id))
        .order_by_desc(activity::Column::RecordedAt)
        .order_by_desc(activity::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No activity recorded yet".to_string()))?;

    let places = load_places(&state, std::slice::from_ref(&latest)).await?;
    Ok(Json(to_response(latest, &places)?))
}

/// The caller's place history, most recent visit first, one entry per place
async fn get_place_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<PlaceVisitResponse>>> {
    let activities = Activity::find()
        .filter(activity::Column::UserId.eq(auth_user.0.id))
        .order_by_desc(activity::Column::RecordedAt)
        .order_by_desc(activity::Column::Id)
        .all(&state.db)
        .await?;

    let places = load_places(&state, &activities).await?;

    // Newest-first walk keeps the latest visit per place
    let mut seen = std::collections::HashSet::new();
    let mut history = Vec::new();
    for a in activities {
        if !seen.insert(a.place_id) {
            continue;
        }
        let place = places
            .get(&a.place_id)
            .cloned()
            .ok_or_else(|| AppError::Internal("Activity references a missing place".to_string()))?;
        history.push(PlaceVisitResponse {
            place: place.into(),
            last_seen_at: a.recorded_at,
        });
    }

    Ok(Json(history))
}
