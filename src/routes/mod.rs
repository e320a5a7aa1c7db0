/// Application routes configuration
use crate::handlers::{get_location, get_snapshot, health, AppState};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Aurora endpoints
        .route("/api/aurora", get(get_snapshot))
        .route("/api/aurora/:id", get(get_location))
        .with_state(state)
}
