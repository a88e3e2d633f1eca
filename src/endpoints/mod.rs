pub mod activities;
pub mod auth;
pub mod events;
pub mod friendships;
pub mod places;
pub mod profiles;

use axum::{middleware as axum_middleware, Router};

use crate::config::CONFIG;
use crate::middleware::{require_auth, security_headers};
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", axum::routing::get(health_check))
        .route("/api/system/version", axum::routing::get(get_version))
        .nest("/auth", auth::auth_routes(state.clone()));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .nest("/api", api_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(state, require_auth));

    // Merge public and protected routes
    public_routes
        .merge(protected_routes)
        .layer(axum_middleware::from_fn(security_headers))
}

/// API routes under /api/* (protected by auth middleware)
fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/profiles", profiles::profiles_routes(state.clone()))
        .nest("/places", places::places_routes(state.clone()))
        .nest("/activities", activities::activities_routes(state.clone()))
        .nest("/friends", friendships::friendships_routes(state.clone()))
        .nest("/events", events::events_routes(state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Version info endpoint
async fn get_version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "version": CONFIG.version,
        "backend": "rust"
    }))
}
