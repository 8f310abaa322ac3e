use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use floodsense_core::error::ApiError;
use floodsense_core::knowledge::{DocumentName, KnowledgeValue};
use floodsense_core::render::TimeOfDay;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/kb", get(list_documents))
        .route("/api/kb/{name}", get(get_document))
        .route("/api/greeting", get(get_greeting))
        .route("/api/flood-risk-levels", get(get_flood_risk_levels))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct KnowledgeListResponse {
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct KnowledgeDocumentResponse {
    pub name: String,
    #[schema(value_type = Object)]
    pub data: KnowledgeValue,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GreetingResponse {
    pub greeting: String,
    pub time_of_day: TimeOfDay,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FloodRiskLevelsResponse {
    #[schema(value_type = Object)]
    pub levels: KnowledgeValue,
}

/// Names of the loaded knowledge documents
#[utoipa::path(
    get,
    path = "/api/kb",
    responses((status = 200, description = "Loaded document names", body = KnowledgeListResponse)),
    tag = "knowledge"
)]
pub async fn list_documents(State(state): State<AppState>) -> Json<KnowledgeListResponse> {
    Json(KnowledgeListResponse {
        documents: loaded_names(&state),
    })
}

/// One loaded knowledge document
#[utoipa::path(
    get,
    path = "/api/kb/{name}",
    params(("name" = String, Path, description = "Document name, e.g. fallback-data")),
    responses(
        (status = 200, description = "Document contents", body = KnowledgeDocumentResponse),
        (status = 404, description = "Unknown or unloaded document", body = ApiError)
    ),
    tag = "knowledge"
)]
pub async fn get_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<KnowledgeDocumentResponse>, AppError> {
    let document = DocumentName::from_name(&name)
        .and_then(|doc| state.engine.knowledge().document(doc).map(|data| (doc, data)));

    match document {
        Some((doc, data)) => Ok(Json(KnowledgeDocumentResponse {
            name: doc.as_str().to_string(),
            data: data.clone(),
        })),
        None => Err(AppError::NotFound {
            resource: format!("knowledge/{name}"),
            available: loaded_names(&state),
        }),
    }
}

/// Greeting for the current time of day
#[utoipa::path(
    get,
    path = "/api/greeting",
    responses((status = 200, description = "Greeting text", body = GreetingResponse)),
    tag = "knowledge"
)]
pub async fn get_greeting(State(state): State<AppState>) -> Json<GreetingResponse> {
    let (time_of_day, greeting) = state.engine.greeting();
    Json(GreetingResponse {
        greeting,
        time_of_day,
        timestamp: Utc::now(),
    })
}

/// Full flood risk level table (empty when the knowledge base has none)
#[utoipa::path(
    get,
    path = "/api/flood-risk-levels",
    responses((status = 200, description = "Risk levels keyed by name", body = FloodRiskLevelsResponse)),
    tag = "knowledge"
)]
pub async fn get_flood_risk_levels(State(state): State<AppState>) -> Json<FloodRiskLevelsResponse> {
    let levels = state
        .engine
        .knowledge()
        .get(DocumentName::FallbackData, &["floodRiskLevels"])
        .cloned()
        .unwrap_or_else(|| KnowledgeValue::Map(BTreeMap::new()));
    Json(FloodRiskLevelsResponse { levels })
}

fn loaded_names(state: &AppState) -> Vec<String> {
    state
        .engine
        .knowledge()
        .document_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}
