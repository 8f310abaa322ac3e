use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use floodsense_core::chat::{AnalysisRequest, AnalysisResponse};

use crate::extract::LenientJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/analysis", post(analyze))
}

/// Assess flood risk from submitted metrics and sensor statuses
#[utoipa::path(
    post,
    path = "/api/analysis",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis text and the path that produced it", body = AnalysisResponse)
    ),
    tag = "assistant"
)]
pub async fn analyze(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<AnalysisRequest>,
) -> Json<AnalysisResponse> {
    let rendered = state.engine.respond_analysis(request).await;
    tracing::info!(source = rendered.source.as_str(), "analysis answered");
    Json(rendered.into())
}
