use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use floodsense_core::chat::{ChatRequest, ChatResponse};

use crate::extract::LenientJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/chat", post(chat))
}

/// Answer a free-text question about the flood monitoring deployment
///
/// Tries the generative backend while it is available and otherwise answers
/// from the knowledge base. Always returns 200; `source` tells which path
/// produced the text and `error` carries diagnostics for degraded answers.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer text and the path that produced it", body = ChatResponse)
    ),
    tag = "assistant"
)]
pub async fn chat(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<ChatRequest>,
) -> Json<ChatResponse> {
    let rendered = state.engine.respond_chat(request).await;
    tracing::info!(source = rendered.source.as_str(), "chat answered");
    Json(rendered.into())
}
