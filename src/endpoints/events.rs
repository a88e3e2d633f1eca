use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::endpoints::friendships::{friend_ids_of, load_user_summaries, UserSummary};
use crate::endpoints::places::PlaceResponse;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::prelude::*;
use crate::models::{event, event_attendee, place};
use crate::state::AppState;

const EVENT_PUBLISHED: &str = "published";
const EVENT_CANCELLED: &str = "cancelled";

const VISIBILITY_PUBLIC: &str = "public";
const VISIBILITY_FRIENDS: &str = "friends";

const ATTENDEE_CONFIRMED: &str = "confirmed";

/// Create events routes
pub fn events_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/mine", get(list_my_events))
        .route("/friends", get(list_friends_events))
        .route("/{event_id}", get(get_event).patch(update_event))
        .route("/{event_id}/cancel", post(cancel_event))
        .route("/{event_id}/join", post(join_event))
        .route("/{event_id}/leave", post(leave_event))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(max = 255))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub place_id: i64,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[validate(range(min = 1))]
    pub max_attendees: Option<i32>,
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub place_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[validate(range(min = 1))]
    pub max_attendees: Option<i32>,
    pub visibility: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: i64,
    pub organizer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub place: PlaceResponse,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_attendees: Option<i32>,
    pub visibility: String,
    pub status: String,
    pub attendee_count: u64,
    pub is_attending: bool,
    pub is_organizer: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<UserSummary>>,
}

// ============================================================================
// Validation Helpers
// ============================================================================

fn check_date(date: NaiveDate) -> Result<()> {
    if date < Utc::now().date_naive() {
        return Err(AppError::BadRequest(
            "Event date must not be in the past".to_string(),
        ));
    }
    Ok(())
}

fn check_times(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err(AppError::BadRequest(
                "Event end time must be after the start time".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_visibility(visibility: &str) -> Result<()> {
    if visibility != VISIBILITY_PUBLIC && visibility != VISIBILITY_FRIENDS {
        return Err(AppError::BadRequest(
            "Invalid visibility value. Must be 'public' or 'friends'".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Response Assembly
// ============================================================================

/// Attach places, confirmed attendee counts and the viewer's derived flags
async fn build_event_responses(
    state: &AppState,
    events: Vec<event::Model>,
    viewer_id: i64,
) -> Result<Vec<EventResponse>> {
    let event_ids: Vec<i64> = events.iter().map(|e| e.id).collect();

    let mut place_ids: Vec<i64> = events.iter().map(|e| e.place_id).collect();
    place_ids.sort();
    place_ids.dedup();
    let places: HashMap<i64, place::Model> = if place_ids.is_empty() {
        HashMap::new()
    } else {
        Place::find()
            .filter(place::Column::Id.is_in(place_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    let attendee_rows = if event_ids.is_empty() {
        Vec::new()
    } else {
        EventAttendee::find()
            .filter(event_attendee::Column::EventId.is_in(event_ids))
            .all(&state.db)
            .await?
    };

    let mut counts: HashMap<i64, u64> = HashMap::new();
    let mut attending: HashSet<i64> = HashSet::new();
    for row in &attendee_rows {
        if row.status == ATTENDEE_CONFIRMED {
            *counts.entry(row.event_id).or_insert(0) += 1;
        }
        if row.user_id == viewer_id {
            attending.insert(row.event_id);
        }
    }

    let mut responses = Vec::with_capacity(events.len());
    for e in events {
        let place = places
            .get(&e.place_id)
            .cloned()
            .ok_or_else(|| AppError::Internal("Event references a missing place".to_string()))?;

        responses.push(EventResponse {
            id: e.id,
            organizer_id: e.organizer_id,
            title: e.title,
            description: e.description,
            place: place.into(),
            date: e.date,
            start_time: e.start_time,
            end_time: e.end_time,
            max_attendees: e.max_attendees,
            visibility: e.visibility,
            status: e.status,
            attendee_count: counts.get(&e.id).copied().unwrap_or(0),
            is_attending: attending.contains(&e.id),
            is_organizer: e.organizer_id == viewer_id,
            created_at: e.created_at,
            attendees: None,
        });
    }

    Ok(responses)
}

async fn build_single_response(
    state: &AppState,
    event: event::Model,
    viewer_id: i64,
) -> Result<EventResponse> {
    let mut responses = build_event_responses(state, vec![event], viewer_id).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("Event response assembly failed".to_string()))
}

/// Number of confirmed attendees for a single event
async fn confirmed_count(state: &AppState, event_id: i64) -> Result<u64> {
    use sea_orm::PaginatorTrait;

    Ok(EventAttendee::find()
        .filter(event_attendee::Column::EventId.eq(event_id))
        .filter(event_attendee::Column::Status.eq(ATTENDEE_CONFIRMED))
        .count(&state.db)
        .await?)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// Create an event; the organizer becomes its first confirmed attendee
async fn create_event(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<CreateEventRequest>,
) -> Result<Json<EventResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let title = data.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Event title is required".to_string()));
    }
    check_date(data.date)?;
    check_times(data.start_time, data.end_time)?;

    let visibility = data
        .visibility
        .unwrap_or_else(|| VISIBILITY_PUBLIC.to_string());
    check_visibility(&visibility)?;

    let place = Place::find_by_id(data.place_id).one(&state.db).await?;
    if place.is_none() {
        return Err(AppError::BadRequest("Invalid place reference".to_string()));
    }

    let now = Utc::now();

    let txn = state.db.begin().await?;

    let new_event = event::ActiveModel {
        organizer_id: Set(auth_user.0.id),
        place_id: Set(data.place_id),
        title: Set(title),
        description: Set(data.description),
        date: Set(data.date),
        start_time: Set(data.start_time),
        end_time: Set(data.end_time),
        max_attendees: Set(data.max_attendees),
        visibility: Set(visibility),
        status: Set(EVENT_PUBLISHED.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = new_event.insert(&txn).await?;

    let organizer_attendance = event_attendee::ActiveModel {
        event_id: Set(created.id),
        user_id: Set(auth_user.0.id),
        status: Set(ATTENDEE_CONFIRMED.to_string()),
        created_at: Set(now),
        ..Default::default()
    };
    organizer_attendance.insert(&txn).await?;

    txn.commit().await?;
    tracing::info!(event_id = created.id, "Event created");

    let response = build_single_response(&state, created, auth_user.0.id).await?;
    Ok(Json(response))
}

/// List upcoming published events visible to the caller
async fn list_events(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<EventResponse>>> {
    let me = auth_user.0.id;
    let today = Utc::now().date_naive();

    let upcoming = Event::find()
        .filter(event::Column::Status.eq(EVENT_PUBLISHED))
        .filter(event::Column::Date.gte(today))
        .order_by_asc(event::Column::Date)
        .order_by_asc(event::Column::StartTime)
        .all(&state.db)
        .await?;

    // Friends-only events are visible to the organizer's friends only
    let friends: HashSet<i64> = friend_ids_of(&state, me).await?.into_iter().collect();
    let visible: Vec<event::Model> = upcoming
        .into_iter()
        .filter(|e| {
            e.visibility == VISIBILITY_PUBLIC
                || e.organizer_id == me
                || friends.contains(&e.organizer_id)
        })
        .collect();

    Ok(Json(build_event_responses(&state, visible, me).await?))
}

/// Events the caller organizes or attends, deduplicated
async fn list_my_events(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<EventResponse>>> {
    let me = auth_user.0.id;

    let organized = Event::find()
        .filter(event::Column::OrganizerId.eq(me))
        .all(&state.db)
        .await?;

    let attended_ids: Vec<i64> = EventAttendee::find()
        .filter(event_attendee::Column::UserId.eq(me))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| a.event_id)
        .collect();
    let attended = if attended_ids.is_empty() {
        Vec::new()
    } else {
        Event::find()
            .filter(event::Column::Id.is_in(attended_ids))
            .all(&state.db)
            .await?
    };

    // Union of both lists, one entry per event
    let mut seen = HashSet::new();
    let mut merged: Vec<event::Model> = Vec::new();
    for e in organized.into_iter().chain(attended) {
        if seen.insert(e.id) {
            merged.push(e);
        }
    }
    merged.sort_by_key(|e| (e.date, e.start_time));

    Ok(Json(build_event_responses(&state, merged, me).await?))
}

/// Upcoming published events organized by the caller's friends
async fn list_friends_events(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<EventResponse>>> {
    let me = auth_user.0.id;
    let today = Utc::now().date_naive();

    let friends = friend_ids_of(&state, me).await?;
    if friends.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let events = Event::find()
        .filter(event::Column::OrganizerId.is_in(friends))
        .filter(event::Column::Status.eq(EVENT_PUBLISHED))
        .filter(event::Column::Date.gte(today))
        .order_by_asc(event::Column::Date)
        .order_by_asc(event::Column::StartTime)
        .all(&state.db)
        .await?;

    Ok(Json(build_event_responses(&state, events, me).await?))
}

/// Get a single event with its confirmed attendee list
async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<EventResponse>> {
    let me = auth_user.0.id;

    let found = Event::find_by_id(event_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    // Friends-only events stay hidden from strangers
    if found.visibility == VISIBILITY_FRIENDS && found.organizer_id != me {
        let friends: HashSet<i64> = friend_ids_of(&state, me).await?.into_iter().collect();
        if !friends.contains(&found.organizer_id) {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
    }

    let attendee_rows = EventAttendee::find()
        .filter(event_attendee::Column::EventId.eq(event_id))
        .filter(event_attendee::Column::Status.eq(ATTENDEE_CONFIRMED))
        .order_by_asc(event_attendee::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let attendee_ids: Vec<i64> = attendee_rows.iter().map(|a| a.user_id).collect();
    let mut summaries = load_user_summaries(&state, &attendee_ids).await?;
    let attendees: Vec<UserSummary> = attendee_rows
        .iter()
        .filter_map(|a| summaries.remove(&a.user_id))
        .collect();

    let mut response = build_single_response(&state, found, me).await?;
    response.attendees = Some(attendees);

    Ok(Json(response))
}

/// Update an event (organizer only)
async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>> {
    data.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = Event::find_by_id(event_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if existing.organizer_id != auth_user.0.id {
        return Err(AppError::Forbidden(
            "Only the organizer can modify this event".to_string(),
        ));
    }

    // Validate against the effective values after the patch
    if let Some(date) = data.date {
        check_date(date)?;
    }
    let effective_start = data.start_time.or(existing.start_time);
    let effective_end = data.end_time.or(existing.end_time);
    check_times(effective_start, effective_end)?;

    if let Some(ref visibility) = data.visibility {
        check_visibility(visibility)?;
    }

    if let Some(max) = data.max_attendees {
        let current = confirmed_count(&state, event_id).await?;
        if (max as u64) < current {
            return Err(AppError::BadRequest(
                "max_attendees cannot be below the current attendee count".to_string(),
            ));
        }
    }

    if let Some(place_id) = data.place_id {
        let place = Place::find_by_id(place_id).one(&state.db).await?;
        if place.is_none() {
            return Err(AppError::BadRequest("Invalid place reference".to_string()));
        }
    }

    let mut event_model: event::ActiveModel = existing.into();
    if let Some(title) = data.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::BadRequest("Event title is required".to_string()));
        }
        event_model.title = Set(title);
    }
    if let Some(description) = data.description {
        event_model.description = Set(Some(description));
    }
    if let Some(place_id) = data.place_id {
        event_model.place_id = Set(place_id);
    }
    if let Some(date) = data.date {
        event_model.date = Set(date);
    }
    if let Some(start_time) = data.start_time {
        event_model.start_time = Set(Some(start_time));
    }
    if let Some(end_time) = data.end_time {
        event_model.end_time = Set(Some(end_time));
    }
    if let Some(max_attendees) = data.max_attendees {
        event_model.max_attendees = Set(Some(max_attendees));
    }
    if let Some(visibility) = data.visibility {
        event_model.visibility = Set(visibility);
    }
    event_model.updated_at = Set(Utc::now());

    let updated = event_model.update(&state.db).await?;
    let response = build_single_response(&state, updated, auth_user.0.id).await?;
    Ok(Json(response))
}

/// Cancel an event (organizer only)
async fn cancel_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<EventResponse>> {
    let existing = Event::find_by_id(event_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if existing.organizer_id != auth_user.0.id {
        return Err(AppError::Forbidden(
            "Only the organizer can modify this event".to_string(),
        ));
    }
    if existing.status == EVENT_CANCELLED {
        return Err(AppError::Conflict("Event is already cancelled".to_string()));
    }

    let mut event_model: event::ActiveModel = existing.into();
    event_model.status = Set(EVENT_CANCELLED.to_string());
    event_model.updated_at = Set(Utc::now());

    let updated = event_model.update(&state.db).await?;
    let response = build_single_response(&state, updated, auth_user.0.id).await?;
    Ok(Json(response))
}

/// Join an event as a confirmed attendee
async fn join_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<EventResponse>> {
    let me = auth_user.0.id;

    let found = Event::find_by_id(event_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if found.status != EVENT_PUBLISHED {
        return Err(AppError::Conflict(
            "This event is not open for registration".to_string(),
        ));
    }

    if found.visibility == VISIBILITY_FRIENDS && found.organizer_id != me {
        let friends: HashSet<i64> = friend_ids_of(&state, me).await?.into_iter().collect();
        if !friends.contains(&found.organizer_id) {
            return Err(AppError::Forbidden(
                "Only friends of the organizer can join this event".to_string(),
            ));
        }
    }

    // Covers confirmed and pending registrations alike
    let already = EventAttendee::find()
        .filter(event_attendee::Column::EventId.eq(event_id))
        .filter(event_attendee::Column::UserId.eq(me))
        .one(&state.db)
        .await?;
    if already.is_some() {
        return Err(AppError::Conflict(
            "You are already registered for this event".to_string(),
        ));
    }

    if let Some(max) = found.max_attendees {
        let current = confirmed_count(&state, event_id).await?;
        if current >= max as u64 {
            return Err(AppError::Conflict("This event is full".to_string()));
        }
    }

    let registration = event_attendee::ActiveModel {
        event_id: Set(event_id),
        user_id: Set(me),
        status: Set(ATTENDEE_CONFIRMED.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    registration.insert(&state.db).await?;

    let response = build_single_response(&state, found, me).await?;
    Ok(Json(response))
}

/// Leave an event (organizers cannot leave their own event)
async fn leave_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let me = auth_user.0.id;

    let found = Event::find_by_id(event_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if found.organizer_id == me {
        return Err(AppError::BadRequest(
            "Organizers cannot leave their own event".to_string(),
        ));
    }

    let registration = EventAttendee::find()
        .filter(event_attendee::Column::EventId.eq(event_id))
        .filter(event_attendee::Column::UserId.eq(me))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("You are not registered for this event".to_string()))?;

    registration.delete(&state.db).await?;

    Ok(Json(serde_json::json!({"message": "Left event"})))
}
