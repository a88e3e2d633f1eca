//! Test helpers and utilities for integration testing.
//!
//! Provides an in-memory SQLite database (run through the real migrator),
//! factories for users/profiles/places, and request helpers for driving the
//! router with bearer tokens.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tower::util::ServiceExt;

use gelaender::endpoints::create_router;
use gelaender::migrations::Migrator;
use gelaender::state::AppState;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    // Use simple in-memory SQLite - each connection gets its own database
    let db_url = "sqlite::memory:";

    let db = Database::connect(db_url)
        .await
        .expect("Failed to create test database");

    // Run migrations using the Migrator
    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// Create a fresh application state backed by an in-memory database
pub async fn build_test_state() -> AppState {
    AppState::new(create_test_db().await)
}

/// Create a test user directly in the database and return the user model
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
) -> gelaender::models::user::Model {
    use gelaender::models::user;
    use gelaender::services::security::hash_password;
    use sea_orm::{ActiveModelTrait, Set};

    let hashed = hash_password(password).unwrap();
    let now = chrono::Utc::now();

    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        hashed_password: Set(hashed),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_user.insert(db).await.unwrap()
}

/// Create a profile for a user directly in the database
pub async fn create_test_profile(
    db: &DatabaseConnection,
    user_id: i64,
    display_name: &str,
) -> gelaender::models::profile::Model {
    use gelaender::models::profile;
    use sea_orm::{ActiveModelTrait, Set};

    let now = chrono::Utc::now();

    let new_profile = profile::ActiveModel {
        user_id: Set(user_id),
        display_name: Set(display_name.to_string()),
        field_of_study: Set(None),
        university: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_profile.insert(db).await.unwrap()
}

/// Create a place directly in the database
pub async fn create_test_place(
    db: &DatabaseConnection,
    name: &str,
    created_by_id: i64,
) -> gelaender::models::place::Model {
    use gelaender::models::place;
    use sea_orm::{ActiveModelTrait, Set};

    let now = chrono::Utc::now();

    let new_place = place::ActiveModel {
        name: Set(name.to_string()),
        latitude: Set(None),
        longitude: Set(None),
        created_by_id: Set(created_by_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_place.insert(db).await.unwrap()
}

/// Make two users friends directly in the database
pub async fn create_test_friendship(db: &DatabaseConnection, user_id: i64, friend_id: i64) {
    use gelaender::models::friendship;
    use sea_orm::{ActiveModelTrait, Set};

    let new_friendship = friendship::ActiveModel {
        user_id: Set(user_id),
        friend_id: Set(friend_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    new_friendship.insert(db).await.unwrap();
}

// ============================================================================
// Request helpers
// ============================================================================

/// POST /auth/login and return (status, body).
pub async fn do_login(app: Router, username: &str, password: &str) -> (StatusCode, String) {
    let body = serde_json::json!({
        "username": username,
        "password": password
    })
    .to_string();

    let request = Request::builder()
        .uri("/auth/login")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Log a test user in via the API and return their access token.
pub async fn login_token(state: &AppState, username: &str, password: &str) -> String {
    let (status, body) = do_login(create_router(state.clone()), username, password).await;
    assert_eq!(status, StatusCode::OK, "Login must succeed. Body: {}", body);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    json["access_token"]
        .as_str()
        .expect("Login response must carry an access_token")
        .to_string()
}

/// Create a user in the database, log them in, return (user id, token).
pub async fn create_and_login(state: &AppState, username: &str) -> (i64, String) {
    let email = format!("{}@example.com", username);
    let user = create_test_user(&state.db, username, &email, "password123").await;
    let token = login_token(state, username, "password123").await;
    (user.id, token)
}

/// Make an authenticated GET request and return (status, body).
pub async fn authenticated_get(app: Router, uri: &str, token: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(uri)
        .method("GET")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Make an authenticated request with a JSON body and return (status, body).
pub async fn authenticated_send(
    app: Router,
    method: &str,
    uri: &str,
    token: &str,
    json_body: &str,
) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Make an authenticated POST request and return (status, body).
pub async fn authenticated_post(
    app: Router,
    uri: &str,
    token: &str,
    json_body: &str,
) -> (StatusCode, String) {
    authenticated_send(app, "POST", uri, token, json_body).await
}

/// Make an authenticated PATCH request and return (status, body).
pub async fn authenticated_patch(
    app: Router,
    uri: &str,
    token: &str,
    json_body: &str,
) -> (StatusCode, String) {
    authenticated_send(app, "PATCH", uri, token, json_body).await
}

/// Make an authenticated DELETE request and return (status, body).
pub async fn authenticated_delete(app: Router, uri: &str, token: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri(uri)
        .method("DELETE")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).to_string())
}
