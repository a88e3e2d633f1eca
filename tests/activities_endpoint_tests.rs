//! Activities endpoint integration tests
//!
//! Covers:
//! - `POST /api/activities` — append with place pre-check and server timestamp
//! - `GET /api/activities` — own log, newest first, paginated
//! - `GET /api/activities/current` — latest activity
//! - `GET /api/activities/history` — deduplicated place history

use axum::http::StatusCode;

mod common;
use common::{
    authenticated_get, authenticated_post, build_test_state, create_and_login, create_test_place,
};

use gelaender::endpoints::create_router;
use gelaender::state::AppState;

async fn check_in(state: &AppState, token: &str, place_id: i64) -> (StatusCode, String) {
    let body = serde_json::json!({"place_id": place_id}).to_string();
    authenticated_post(create_router(state.clone()), "/api/activities", token, &body).await
}

#[tokio::test]
async fn test_create_activity() {
    let state = build_test_state().await;
    let (user_id, token) = create_and_login(&state, "walker").await;
    let place = create_test_place(&state.db, "Mensa", user_id).await;

    let body = serde_json::json!({
        "place_id": place.id,
        "photo_url": "https://img.example.com/mensa.jpg"
    })
    .to_string();
    let (status, body) =
        authenticated_post(create_router(state), "/api/activities", &token, &body).await;

    assert_eq!(status, StatusCode::OK, "Body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["place"]["name"], "Mensa");
    assert_eq!(json["photo_url"], "https://img.example.com/mensa.jpg");
    assert!(
        json["recorded_at"].as_str().is_some(),
        "Timestamp must be set by the server"
    );
}

#[tokio::test]
async fn test_create_activity_invalid_place() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "lost").await;

    let (status, body) = check_in(&state, &token, 12345).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid place reference"), "Body: {}", body);
}

#[tokio::test]
async fn test_current_place_without_activities() {
    let state = build_test_state().await;
    let (_, token) = create_and_login(&state, "homebody").await;

    let (status, _) =
        authenticated_get(create_router(state), "/api/activities/current", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_current_place_is_latest_activity() {
    let state = build_test_state().await;
    let (user_id, token) = create_and_login(&state, "mover").await;
    let mensa = create_test_place(&state.db, "Mensa", user_id).await;
    let bib = create_test_place(&state.db, "Bibliothek", user_id).await;

    let (status, _) = check_in(&state, &token, mensa.id).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check_in(&state, &token, bib.id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        authenticated_get(create_router(state), "/api/activities/current", &token).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        json["place"]["name"], "Bibliothek",
        "Current place must be the most recent check-in"
    );
}

#[tokio::test]
async fn test_activity_log_is_per_user() {
    let state = build_test_state().await;
    let (alice_id, alice_token) = create_and_login(&state, "alice").await;
    let (_, bob_token) = create_and_login(&state, "bob").await;
    let place = create_test_place(&state.db, "Hörsaal", alice_id).await;

    let (status, _) = check_in(&state, &alice_token, place.id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        authenticated_get(create_router(state), "/api/activities", &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        json["total"], 0,
        "Bob must not see Alice's activities. Body: {}",
        body
    );
}

#[tokio::test]
async fn test_activity_list_newest_first() {
    let state = build_test_state().await;
    let (user_id, token) = create_and_login(&state, "lister").await;
    let mensa = create_test_place(&state.db, "Mensa", user_id).await;
    let bib = create_test_place(&state.db, "Bibliothek", user_id).await;

    check_in(&state, &token, mensa.id).await;
    check_in(&state, &token, bib.id).await;

    let (status, body) =
        authenticated_get(create_router(state), "/api/activities", &token).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["place"]["name"], "Bibliothek");
    assert_eq!(items[1]["place"]["name"], "Mensa");
}

#[tokio::test]
async fn test_history_deduplicates_places() {
    let state = build_test_state().await;
    let (user_id, token) = create_and_login(&state, "regular").await;
    let mensa = create_test_place(&state.db, "Mensa", user_id).await;
    let bib = create_test_place(&state.db, "Bibliothek", user_id).await;

    // Mensa, Bibliothek, Mensa again
    check_in(&state, &token, mensa.id).await;
    check_in(&state, &token, bib.id).await;
    check_in(&state, &token, mensa.id).await;

    let (status, body) =
        authenticated_get(create_router(state), "/api/activities/history", &token).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(
        entries.len(),
        2,
        "History must hold one entry per place. Body: {}",
        body
    );
    assert_eq!(entries[0]["place"]["name"], "Mensa");
    assert_eq!(entries[1]["place"]["name"], "Bibliothek");
}
