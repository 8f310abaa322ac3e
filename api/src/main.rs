use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use floodsense_core::availability::AvailabilityState;
use floodsense_core::knowledge::KnowledgeBase;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod engine;
mod error;
mod extract;
mod generative;
mod middleware;
mod routes;
mod state;

use crate::engine::ResponseEngine;
use crate::generative::{GeminiClient, GenerativeBackend};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Floodsense API",
        version = "0.1.0",
        description = "Answers questions about a flood monitoring deployment, with or without a generative backend."
    ),
    paths(
        routes::health::health_check,
        routes::chat::chat,
        routes::analysis::analyze,
        routes::ai::ai_status,
        routes::ai::toggle_ai,
        routes::knowledge::list_documents,
        routes::knowledge::get_document,
        routes::knowledge::get_greeting,
        routes::knowledge::get_flood_risk_levels,
    ),
    components(schemas(
        HealthResponse,
        floodsense_core::error::ApiError,
        floodsense_core::availability::AvailabilityState,
        floodsense_core::chat::ChatTurn,
        floodsense_core::chat::ChatRequest,
        floodsense_core::chat::ChatResponse,
        floodsense_core::chat::SensorReading,
        floodsense_core::chat::AnalysisRequest,
        floodsense_core::chat::AnalysisResponse,
        floodsense_core::chat::ResponseSource,
        floodsense_core::render::TimeOfDay,
        routes::ai::AiStatusResponse,
        routes::knowledge::KnowledgeListResponse,
        routes::knowledge::KnowledgeDocumentResponse,
        routes::knowledge::GreetingResponse,
        routes::knowledge::FloodRiskLevelsResponse,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub knowledge_documents: usize,
    pub generative: AvailabilityState,
}

fn app(app_state: state::AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::chat::router())
        .merge(routes::analysis::router())
        .merge(routes::ai::router())
        .merge(routes::knowledge::router())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::cors::build_cors_layer(cors_origins))
                .layer(middleware::catch_panic::build_catch_panic_layer()),
        )
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floodsense_api=debug,floodsense_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::AppConfig::from_env();

    let kb = KnowledgeBase::load(&config.kb_dir, Some(&config.kb_fallback_dir));
    tracing::info!(documents = ?kb.document_names(), "knowledge base ready");

    let backend: Option<Arc<dyn GenerativeBackend>> = match &config.generative {
        Some(generative) => match GeminiClient::new(generative) {
            Ok(client) => {
                tracing::info!(model = %generative.model, timeout = ?generative.timeout, "generative backend configured");
                Some(Arc::new(client))
            }
            Err(err) => {
                tracing::error!(error = %err, "generative backend unavailable; using knowledge base only");
                None
            }
        },
        None => {
            tracing::warn!("GEMINI_API_KEY not set; using knowledge base only");
            None
        }
    };

    let engine = ResponseEngine::new(Arc::new(kb), backend, config.timezone);
    let app = app(state::AppState::new(engine), &config.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Floodsense API listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(error = %err, "server terminated");
        std::process::exit(1);
    }
}
