//! HTTP route handlers.

use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use tracing::warn;

use crate::manager::BoardSnapshot;

use super::dto::*;
use super::state::AppState;
use super::templates::*;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(board_page))
        .route("/health", get(health))
        .route("/zone/:index", get(switch_zone))
        .route("/api/board", get(board_json))
        .route("/api/zones", get(list_zones))
        .route("/api/zones/select", post(select_zone))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The departure board page.
async fn board_page(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    let current = state.current_zone().await;
    Html(
        BoardTemplate::new(&snapshot, &state.zones, current)
            .render()
            .unwrap_or_else(|e| format!("Template error: {}", e)),
    )
}

/// Latest snapshot as JSON.
async fn board_json(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.snapshot().await)
}

async fn list_zones(State(state): State<AppState>) -> Json<ZoneListResponse> {
    let current = state.current_zone().await;
    let zones = state
        .zones
        .iter()
        .enumerate()
        .map(|(i, z)| ZoneSummary::from_config(i, z, i == current))
        .collect();
    Json(ZoneListResponse { zones })
}

/// Put another zone on the board.
async fn select_zone(
    State(state): State<AppState>,
    Json(req): Json<SelectZoneRequest>,
) -> Result<Json<ZoneSummary>, AppError> {
    let zone = state
        .select_zone(req.index)
        .await
        .ok_or_else(|| AppError::NotFound {
            message: format!("No zone with index {}", req.index),
        })?;
    Ok(Json(ZoneSummary::from_config(req.index, zone, true)))
}

/// Zone links on the board page.
async fn switch_zone(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Redirect, AppError> {
    state
        .select_zone(index)
        .await
        .ok_or_else(|| AppError::NotFound {
            message: format!("No zone with index {}", index),
        })?;
    Ok(Redirect::to("/"))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, "{message}");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
