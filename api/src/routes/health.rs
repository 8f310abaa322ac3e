use axum::extract::State;
use axum::{Json, Router, routing::get};

use crate::HealthResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check endpoint; reports loaded knowledge and generative availability
///
/// Always 200: an empty knowledge base or a disabled generative backend only
/// degrades answers, it does not make the service unavailable.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let knowledge_documents = state.engine.knowledge().len();
    let status = if knowledge_documents == 0 { "degraded" } else { "ok" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        knowledge_documents,
        generative: state.engine.availability().snapshot(),
    })
}
