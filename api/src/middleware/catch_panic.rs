use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use floodsense_core::chat::{ChatResponse, RenderedResponse, ResponseSource};
use tower_http::catch_panic::CatchPanicLayer;

use crate::engine::EMERGENCY_TEXT;

pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Turn a handler panic into the emergency answer instead of a dropped connection.
pub fn build_catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(emergency_response as PanicHandler)
}

fn emergency_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "request handler panicked");

    let body = ChatResponse::from(
        RenderedResponse::new(EMERGENCY_TEXT.to_string(), ResponseSource::EmergencyFallback)
            .with_error("internal fault"),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
