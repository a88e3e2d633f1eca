//! Profiles endpoint integration tests
//!
//! Covers:
//! - `POST /api/profiles` — create (exactly one per user)
//! - `GET /api/profiles/me` — own profile
//! - `PATCH /api/profiles/me` — partial update
//! - `GET /api/profiles/{user_id}` — other users' profiles

use axum::http::StatusCode;

mod common;
use common::{
    authenticated_get, authenticated_patch, authenticated_post, build_test_state, create_and_login,
};

use gelaender::endpoints::create_router;

#[tokio::test]
async fn test_create_and_fetch_profile() {
    let state = build_test_state().await;
    let (user_id, token) = create_and_login(&state, "mira").await;

    let body = serde_json::json!({
        "display_name": "Mira S.",
        "field_of_study": "Informatik",
        "university": "TU Berlin"
    })
    .to_string();

    let (status, body) =
        authenticated_post(create_router(state.clone()), "/api/profiles", &token, &body).await;
    assert_eq!(status, StatusCode::OK, "Profile creation must succeed. Body: {}", body);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["user_id"], user_id);
    assert_eq!(json["display_name"], "Mira S.");
    assert_eq!(json["field_of_study"], "Informatik");
    assert_eq!(json["university"], "TU Berlin");

    let (status, body) =
        authenticated_get(create_router(state), "/api/profiles/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["display_name"], "Mira S.");
}

#[tokio::test]
async fn test_second_profile_is_rejected() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "paul").await;

    let body = serde_json::json!({"display_name": "Paul"}).to_string();
    let (status, _) =
        authenticated_post(create_router(state.clone()), "/api/profiles", &token, &body).await;
    assert_eq!(status, StatusCode::OK);

    let body = serde_json::json!({"display_name": "Paul again"}).to_string();
    let (status, body) =
        authenticated_post(create_router(state), "/api/profiles", &token, &body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("You already have a profile"), "Body: {}", body);
}

#[tokio::test]
async fn test_create_profile_requires_display_name() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "nameless").await;

    // Whitespace-only display name counts as empty
    let body = serde_json::json!({"display_name": "   "}).to_string();
    let (status, body) =
        authenticated_post(create_router(state), "/api/profiles", &token, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Display name is required"), "Body: {}", body);
}

#[tokio::test]
async fn test_display_name_is_trimmed() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "spacey").await;

    let body = serde_json::json!({"display_name": "  Spacey  "}).to_string();
    let (status, body) =
        authenticated_post(create_router(state), "/api/profiles", &token, &body).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["display_name"], "Spacey");
}

#[tokio::test]
async fn test_get_my_profile_before_creation() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "newbie").await;

    let (status, _) = authenticated_get(create_router(state), "/api/profiles/me", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_profile() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "jonas").await;

    let body = serde_json::json!({"display_name": "Jonas"}).to_string();
    let (status, _) =
        authenticated_post(create_router(state.clone()), "/api/profiles", &token, &body).await;
    assert_eq!(status, StatusCode::OK);

    let body = serde_json::json!({
        "field_of_study": "Maschinenbau",
        "university": "RWTH Aachen"
    })
    .to_string();
    let (status, body) =
        authenticated_patch(create_router(state), "/api/profiles/me", &token, &body).await;

    assert_eq!(status, StatusCode::OK, "Body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["display_name"], "Jonas", "Unchanged fields must persist");
    assert_eq!(json["field_of_study"], "Maschinenbau");
    assert_eq!(json["university"], "RWTH Aachen");
}

#[tokio::test]
async fn test_update_cannot_blank_display_name() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "stubborn").await;

    let body = serde_json::json!({"display_name": "Stubborn"}).to_string();
    let (status, _) =
        authenticated_post(create_router(state.clone()), "/api/profiles", &token, &body).await;
    assert_eq!(status, StatusCode::OK);

    let body = serde_json::json!({"display_name": ""}).to_string();
    let (status, _) =
        authenticated_patch(create_router(state), "/api/profiles/me", &token, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_other_users_profile() {
    let state = build_test_state().await;
    let (alice_id, _) = create_and_login(&state, "alice").await;
    let (_, bob_token) = create_and_login(&state, "bob").await;

    common::create_test_profile(&state.db, alice_id, "Alice A.").await;

    let uri = format!("/api/profiles/{}", alice_id);
    let (status, body) = authenticated_get(create_router(state), &uri, &bob_token).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["display_name"], "Alice A.");
}

#[tokio::test]
async fn test_get_missing_profile_returns_404() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "seeker").await;

    let (status, _) =
        authenticated_get(create_router(state), "/api/profiles/99999", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
