//! Lenient JSON extraction for endpoints that must always answer.
//!
//! `LenientJson<T>` behaves like `axum::Json<T>` for well-formed bodies. When the
//! body is missing, not JSON, or does not match `T`, the rejection is logged
//! and `T::default()` is handed to the handler instead of a 4xx response.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: Default,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(LenientJson(value)),
            Err(rejection) => {
                let body_text = rejection.body_text();
                let field = extract_field_from_serde_message(&body_text);
                tracing::warn!(
                    field = field.as_deref().unwrap_or("body"),
                    error = %body_text,
                    "malformed request body; continuing with defaults"
                );
                Ok(LenientJson(T::default()))
            }
        }
    }
}

/// Try to extract a field name from serde's error messages.
fn extract_field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|pattern| {
            let start = msg.find(pattern)? + pattern.len();
            let after = &msg[start..];
            after.find('`').map(|end| after[..end].to_string())
        })
}
