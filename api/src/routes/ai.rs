use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use floodsense_core::availability::{AvailabilityState, QUOTA_FAILURE_THRESHOLD};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ai/status", get(ai_status))
        .route("/api/ai/toggle", post(toggle_ai))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AiStatusResponse {
    pub enabled: bool,
    pub consecutive_quota_failures: u32,
    /// Quota failures in a row that disable the backend
    pub failure_threshold: u32,
    /// False when no API key is configured; chat then always uses the knowledge base
    pub backend_configured: bool,
}

impl AiStatusResponse {
    fn new(state: AvailabilityState, backend_configured: bool) -> Self {
        Self {
            enabled: state.enabled,
            consecutive_quota_failures: state.consecutive_quota_failures,
            failure_threshold: QUOTA_FAILURE_THRESHOLD,
            backend_configured,
        }
    }
}

/// Current availability of the generative backend
#[utoipa::path(
    get,
    path = "/api/ai/status",
    responses((status = 200, description = "Breaker state", body = AiStatusResponse)),
    tag = "ai"
)]
pub async fn ai_status(State(state): State<AppState>) -> Json<AiStatusResponse> {
    Json(AiStatusResponse::new(
        state.engine.availability().snapshot(),
        state.engine.backend_configured(),
    ))
}

/// Flip the generative backend on or off and reset its failure count
#[utoipa::path(
    post,
    path = "/api/ai/toggle",
    responses((status = 200, description = "Breaker state after the toggle", body = AiStatusResponse)),
    tag = "ai"
)]
pub async fn toggle_ai(State(state): State<AppState>) -> Json<AiStatusResponse> {
    let new_state = state.engine.availability().toggle();
    tracing::info!(enabled = new_state.enabled, "generative backend toggled");
    Json(AiStatusResponse::new(
        new_state,
        state.engine.backend_configured(),
    ))
}
