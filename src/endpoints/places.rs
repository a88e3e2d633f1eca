use axum::{
    extract::{Extension, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::place;
use crate::models::prelude::*;
use crate::state::AppState;

/// Create places routes
pub fn places_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_places).post(create_place))
        .route("/{place_id}", get(get_place).patch(update_place))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlaceRequest {
    #[validate(length(max = 255))]
    pub name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlaceRequest {
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PlaceResponse {
    pub id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_by_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<place::Model> for PlaceResponse {
    fn from(p: place::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            latitude: p.latitude,
            longitude: p.longitude,
            created_by_id: p.created_by_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// One page of results plus the pagination math the client needs
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        Self {
            items,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Clamp raw pagination query params to sane bounds
pub fn page_params(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    (page, per_page)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Case-insensitive duplicate-name check, optionally excluding one place id
async fn name_taken(state: &AppState, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let mut query = Place::find().filter(
        Expr::expr(Func::lower(Expr::col(place::Column::Name))).eq(name.to_lowercase()),
    );
    if let Some(id) = exclude_id {
        query = query.filter(place::Column::Id.ne(id));
    }
    Ok(query.one(&state.db).await?.is_some())
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    if latitude.is_some() != longitude.is_some() {
        return Err(AppError::BadRequest(
            "Latitude and longitude must be provided together".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// Search and paginate places by name
async fn list_places(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse<PlaceResponse>>> {
    let (page, per_page) = page_params(params.page, params.per_page);

    let mut query = Place::find();
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.filter(place::Column::Name.contains(q));
    }

    let paginator = query
        .order_by_asc(place::Column::Name)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Json(PageResponse::new(
        items.into_iter().map(PlaceResponse::from).collect(),
        total,
        page,
        per_page,
    )))
}

/// Get a place by ID
async fn get_place(
    State(state): State<AppState>,
    Path(place_id): Path<i64>,
) -> Result<Json<PlaceResponse>> {
    let found = Place::find_by_id(place_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".to_string()))?;

    Ok(Json(found.into()))
}

/// Create a new place
async fn create_place(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<CreatePlaceRequest>,
) -> Result<Json<PlaceResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Place name is required".to_string()));
    }
    check_coordinates(data.latitude, data.longitude)?;

    if name_taken(&state, &name, None).await? {
        return Err(AppError::Conflict(
            "A place with this name already exists".to_string(),
        ));
    }

    let now = Utc::now();
    let new_place = place::ActiveModel {
        name: Set(name),
        latitude: Set(data.latitude),
        longitude: Set(data.longitude),
        created_by_id: Set(auth_user.0.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_place.insert(&state.db).await?;
    Ok(Json(created.into()))
}

/// Update an existing place
async fn update_place(
    State(state): State<AppState>,
    Path(place_id): Path<i64>,
    Json(data): Json<UpdatePlaceRequest>,
) -> Result<Json<PlaceResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = Place::find_by_id(place_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".to_string()))?;

    let mut place_model: place::ActiveModel = existing.into();

    if let Some(name) = data.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Place name is required".to_string()));
        }
        if name_taken(&state, &name, Some(place_id)).await? {
            return Err(AppError::Conflict(
                "A place with this name already exists".to_string(),
            ));
        }
        place_model.name = Set(name);
    }

    if data.latitude.is_some() || data.longitude.is_some() {
        check_coordinates(data.latitude, data.longitude)?;
        place_model.latitude = Set(data.latitude);
        place_model.longitude = Set(data.longitude);
    }

    place_model.updated_at = Set(Utc::now());

    let updated = place_model.update(&state.db).await?;
    Ok(Json(updated.into()))
}
