use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::prelude::*;
use crate::models::{friendship, friendship_invite, profile, user};
use crate::state::AppState;

const INVITE_PENDING: &str = "pending";
const INVITE_ACCEPTED: &str = "accepted";
const INVITE_REJECTED: &str = "rejected";

/// Maximum number of rows returned by the user search
const SEARCH_LIMIT: usize = 20;

/// Create friendships routes
pub fn friendships_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_friends))
        .route("/search", get(search_users))
        .route("/invites", get(list_incoming_invites).post(create_invite))
        .route("/invites/sent", get(list_sent_invites))
        .route("/invites/{invite_id}/accept", post(accept_invite))
        .route("/invites/{invite_id}/reject", post(reject_invite))
        .route("/{user_id}", delete(remove_friend))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub recipient_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// A user as shown in friend lists and search results
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub field_of_study: Option<String>,
    pub university: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FriendResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub friends_since: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<friendship_invite::Model> for InviteResponse {
    fn from(inv: friendship_invite::Model) -> Self {
        Self {
            id: inv.id,
            sender_id: inv.sender_id,
            recipient_id: inv.recipient_id,
            status: inv.status,
            created_at: inv.created_at,
        }
    }
}

/// A pending invite with the counterpart user embedded
#[derive(Debug, Serialize)]
pub struct InviteWithUserResponse {
    pub id: i64,
    pub user: UserSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn pair_condition(a: i64, b: i64) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(friendship::Column::UserId.eq(a))
                .add(friendship::Column::FriendId.eq(b)),
        )
        .add(
            Condition::all()
                .add(friendship::Column::UserId.eq(b))
                .add(friendship::Column::FriendId.eq(a)),
        )
}

/// Find the symmetric friendship row for a pair, if any
async fn find_friendship(state: &AppState, a: i64, b: i64) -> Result<Option<friendship::Model>> {
    Ok(Friendship::find()
        .filter(pair_condition(a, b))
        .one(&state.db)
        .await?)
}

/// Find a pending invite between two users, in either direction
async fn find_pending_invite(
    state: &AppState,
    a: i64,
    b: i64,
) -> Result<Option<friendship_invite::Model>> {
    Ok(FriendshipInvite::find()
        .filter(friendship_invite::Column::Status.eq(INVITE_PENDING))
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(friendship_invite::Column::SenderId.eq(a))
                        .add(friendship_invite::Column::RecipientId.eq(b)),
                )
                .add(
                    Condition::all()
                        .add(friendship_invite::Column::SenderId.eq(b))
                        .add(friendship_invite::Column::RecipientId.eq(a)),
                ),
        )
        .one(&state.db)
        .await?)
}

/// All user ids the given user is friends with
pub(crate) async fn friend_ids_of(state: &AppState, user_id: i64) -> Result<Vec<i64>> {
    let rows = Friendship::find()
        .filter(
            Condition::any()
                .add(friendship::Column::UserId.eq(user_id))
                .add(friendship::Column::FriendId.eq(user_id)),
        )
        .all(&state.db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|f| if f.user_id == user_id { f.friend_id } else { f.user_id })
        .collect())
}

/// Load user rows plus profiles and map them to summaries, keyed by user id
pub(crate) async fn load_user_summaries(
    state: &AppState,
    user_ids: &[i64],
) -> Result<HashMap<i64, UserSummary>> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = User::find()
        .filter(user::Column::Id.is_in(user_ids.to_vec()))
        .all(&state.db)
        .await?;
    let profiles: HashMap<i64, profile::Model> = Profile::find()
        .filter(profile::Column::UserId.is_in(user_ids.to_vec()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();

    Ok(users
        .into_iter()
        .map(|u| {
            let p = profiles.get(&u.id);
            (
                u.id,
                UserSummary {
                    user_id: u.id,
                    username: u.username,
                    display_name: p.map(|p| p.display_name.clone()),
                    field_of_study: p.and_then(|p| p.field_of_study.clone()),
                    university: p.and_then(|p| p.university.clone()),
                },
            )
        })
        .collect())
}

// ============================================================================
// Friend List Endpoints
// ============================================================================

/// List the caller's friends
async fn list_friends(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<FriendResponse>>> {
    let me = auth_user.0.id;

    let rows = Friendship::find()
        .filter(
            Condition::any()
                .add(friendship::Column::UserId.eq(me))
                .add(friendship::Column::FriendId.eq(me)),
        )
        .order_by_asc(friendship::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let friend_ids: Vec<i64> = rows
        .iter()
        .map(|f| if f.user_id == me { f.friend_id } else { f.user_id })
        .collect();
    let mut summaries = load_user_summaries(&state, &friend_ids).await?;

    let mut friends = Vec::with_capacity(rows.len());
    for f in rows {
        let other = if f.user_id == me { f.friend_id } else { f.user_id };
        if let Some(user) = summaries.remove(&other) {
            friends.push(FriendResponse {
                user,
                friends_since: f.created_at,
            });
        }
    }

    Ok(Json(friends))
}

/// Dissolve a friendship
async fn remove_friend(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>> {
    let row = find_friendship(&state, auth_user.0.id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("You are not friends with this user".to_string()))?;

    row.delete(&state.db).await?;

    Ok(Json(serde_json::json!({"message": "Friend removed"})))
}

// ============================================================================
// Invite Endpoints
// ============================================================================

/// Send a friend invite
async fn create_invite(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(data): Json<CreateInviteRequest>,
) -> Result<Json<InviteResponse>> {
    let me = auth_user.0.id;

    if data.recipient_id == me {
        return Err(AppError::BadRequest(
            "You cannot invite yourself".to_string(),
        ));
    }

    let recipient = User::find_by_id(data.recipient_id).one(&state.db).await?;
    if recipient.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    if find_friendship(&state, me, data.recipient_id).await?.is_some() {
        return Err(AppError::Conflict("You are already friends".to_string()));
    }

    if find_pending_invite(&state, me, data.recipient_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "A friend invite is already pending".to_string(),
        ));
    }

    let new_invite = friendship_invite::ActiveModel {
        sender_id: Set(me),
        recipient_id: Set(data.recipient_id),
        status: Set(INVITE_PENDING.to_string()),
        created_at: Set(Utc::now()),
        responded_at: Set(None),
        ..Default::default()
    };

    let created = new_invite.insert(&state.db).await?;
    Ok(Json(created.into()))
}

/// List pending invites addressed to the caller
async fn list_incoming_invites(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<InviteWithUserResponse>>> {
    let invites = FriendshipInvite::find()
        .filter(friendship_invite::Column::RecipientId.eq(auth_user.0.id))
        .filter(friendship_invite::Column::Status.eq(INVITE_PENDING))
        .order_by_desc(friendship_invite::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let sender_ids: Vec<i64> = invites.iter().map(|i| i.sender_id).collect();
    let mut summaries = load_user_summaries(&state, &sender_ids).await?;

    let mut responses = Vec::with_capacity(invites.len());
    for inv in invites {
        if let Some(user) = summaries.remove(&inv.sender_id) {
            responses.push(InviteWithUserResponse {
                id: inv.id,
                user,
                created_at: inv.created_at,
            });
        }
    }

    Ok(Json(responses))
}

/// List pending invites the caller has sent
async fn list_sent_invites(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<InviteWithUserResponse>>> {
    let invites = FriendshipInvite::find()
        .filter(friendship_invite::Column::SenderId.eq(auth_user.0.id))
        .filter(friendship_invite::Column::Status.eq(INVITE_PENDING))
        .order_by_desc(friendship_invite::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let recipient_ids: Vec<i64> = invites.iter().map(|i| i.recipient_id).collect();
    let mut summaries = load_user_summaries(&state, &recipient_ids).await?;

    let mut responses = Vec::with_capacity(invites.len());
    for inv in invites {
        if let Some(user) = summaries.remove(&inv.recipient_id) {
            responses.push(InviteWithUserResponse {
                id: inv.id,
                user,
                created_at: inv.created_at,
            });
        }
    }

    Ok(Json(responses))
}

/// Accept an invite: mark it accepted and create the friendship atomically
async fn accept_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<InviteResponse>> {
    let invite = FriendshipInvite::find_by_id(invite_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite not found".to_string()))?;

    if invite.recipient_id != auth_user.0.id {
        return Err(AppError::Forbidden(
            "Only the recipient can respond to an invite".to_string(),
        ));
    }
    if invite.status != INVITE_PENDING {
        return Err(AppError::Conflict(
            "Invite has already been handled".to_string(),
        ));
    }

    let now = Utc::now();

    // Status change and friendship row must land together
    let txn = state.db.begin().await?;

    let mut invite_model: friendship_invite::ActiveModel = invite.into();
    invite_model.status = Set(INVITE_ACCEPTED.to_string());
    invite_model.responded_at = Set(Some(now));
    let updated = invite_model.update(&txn).await?;

    let new_friendship = friendship::ActiveModel {
        user_id: Set(updated.sender_id),
        friend_id: Set(updated.recipient_id),
        created_at: Set(now),
        ..Default::default()
    };
    new_friendship.insert(&txn).await?;

    txn.commit().await?;

    Ok(Json(updated.into()))
}

/// Reject an invite
async fn reject_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<i64>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<InviteResponse>> {
    let invite = FriendshipInvite::find_by_id(invite_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite not found".to_string()))?;

    if invite.recipient_id != auth_user.0.id {
        return Err(AppError::Forbidden(
            "Only the recipient can respond to an invite".to_string(),
        ));
    }
    if invite.status != INVITE_PENDING {
        return Err(AppError::Conflict(
            "Invite has already been handled".to_string(),
        ));
    }

    let mut invite_model: friendship_invite::ActiveModel = invite.into();
    invite_model.status = Set(INVITE_REJECTED.to_string());
    invite_model.responded_at = Set(Some(Utc::now()));
    let updated = invite_model.update(&state.db).await?;

    Ok(Json(updated.into()))
}

// ============================================================================
// User Search
// ============================================================================

/// Search for users the caller could add as friends
async fn search_users(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserSummary>>> {
    let me = auth_user.0.id;

    let q = params.q.as_deref().unwrap_or("").trim().to_string();
    if q.chars().count() < 2 {
        return Err(AppError::BadRequest(
            "Search term must be at least 2 characters".to_string(),
        ));
    }
    let pattern = format!("%{}%", q.to_lowercase());

    // Match on username or profile display name
    let username_matches = User::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(user::Column::Username))).like(pattern.as_str()),
        )
        .all(&state.db)
        .await?;
    let profile_matches = Profile::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(profile::Column::DisplayName)))
                .like(pattern.as_str()),
        )
        .all(&state.db)
        .await?;

    let mut candidate_ids: Vec<i64> = username_matches
        .iter()
        .map(|u| u.id)
        .chain(profile_matches.iter().map(|p| p.user_id))
        .collect();
    candidate_ids.sort();
    candidate_ids.dedup();

    // Exclude self, existing friends, and anyone with a pending invite
    // in either direction
    let mut excluded: HashSet<i64> = HashSet::new();
    excluded.insert(me);
    excluded.extend(friend_ids_of(&state, me).await?);

    let open_invites = FriendshipInvite::find()
        .filter(friendship_invite::Column::Status.eq(INVITE_PENDING))
        .filter(
            Condition::any()
                .add(friendship_invite::Column::SenderId.eq(me))
                .add(friendship_invite::Column::RecipientId.eq(me)),
        )
        .all(&state.db)
        .await?;
    for inv in open_invites {
        excluded.insert(if inv.sender_id == me {
            inv.recipient_id
        } else {
            inv.sender_id
        });
    }

    candidate_ids.retain(|id| !excluded.contains(id));
    candidate_ids.truncate(SEARCH_LIMIT);

    let summaries = load_user_summaries(&state, &candidate_ids).await?;
    let mut results: Vec<UserSummary> = summaries.into_values().collect();
    results.sort_by(|a, b| a.username.cmp(&b.username));

    Ok(Json(results))
}
