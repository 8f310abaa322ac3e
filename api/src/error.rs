use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use floodsense_core::error::{self, ApiError};

/// Errors surfaced to callers of the introspection endpoints.
///
/// Chat and analysis never fail; they degrade to fallback text instead.
#[derive(Debug)]
pub enum AppError {
    /// Requested resource does not exist (404)
    NotFound {
        resource: String,
        available: Vec<String>,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::NotFound {
                resource,
                available,
            } => {
                tracing::debug!(resource = %resource, "resource not found");
                (
                    StatusCode::NOT_FOUND,
                    ApiError {
                        error: error::codes::NOT_FOUND.to_string(),
                        message: format!("'{resource}' was not found"),
                        field: None,
                        docs_hint: Some(format!("Available: {}", available.join(", "))),
                        received: Some(serde_json::json!({ "available": available })),
                        request_id,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn not_found_lists_available_names() {
        let response = AppError::NotFound {
            resource: "knowledge/tides".to_string(),
            available: vec!["alerts".to_string(), "reports".to_string()],
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("body should be JSON");
        assert_eq!(value["error"], "not_found");
        assert_eq!(value["received"]["available"][1], "reports");
        assert_eq!(value["docs_hint"], "Available: alerts, reports");
    }
}
