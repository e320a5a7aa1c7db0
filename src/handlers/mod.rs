/// HTTP request handlers
use crate::domain::{AuroraSnapshot, Health, Location};
use crate::errors::ApiError;
use crate::services::AuroraService;
use axum::{
    extract::{Path, State},
    http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

const SNAPSHOT_CACHE_CONTROL: &str = "public, max-age=300, s-maxage=300";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuroraService>,
    pub locations: Arc<Vec<Location>>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

fn cacheable(snapshot: AuroraSnapshot) -> impl IntoResponse {
    (
        [
            (CACHE_CONTROL, SNAPSHOT_CACHE_CONTROL),
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Json(SuccessResponse::new(snapshot)),
    )
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Snapshot for every configured location
pub async fn get_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state
        .service
        .compute_snapshot(&state.locations, Utc::now())
        .await;
    cacheable(snapshot)
}

/// Snapshot restricted to one location
pub async fn get_location(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state
        .locations
        .iter()
        .find(|l| l.id == id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("unknown location '{id}'")))?;

    let snapshot = state
        .service
        .compute_snapshot(std::slice::from_ref(&location), Utc::now())
        .await;
    Ok(cacheable(snapshot))
}
