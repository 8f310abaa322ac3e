//! Client for the generative backend.
//!
//! The engine only sees [`GenerativeBackend`]; quota-class failures are told
//! apart from everything else because they drive the availability breaker.

use std::future::Future;
use std::pin::Pin;

use floodsense_core::chat::ChatTurn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GenerativeConfig;

const QUOTA_MARKERS: &[&str] = &["429", "quota", "billing"];

#[derive(Debug, thiserror::Error)]
pub enum GenerativeError {
    #[error("generative quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("generative request failed: {0}")]
    Other(String),
}

impl GenerativeError {
    /// Classify a raw failure description by its quota markers.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            GenerativeError::QuotaExceeded(message)
        } else {
            GenerativeError::Other(message)
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, GenerativeError::QuotaExceeded(_))
    }
}

pub type GenerativeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerativeError>> + Send + 'a>>;

pub trait GenerativeBackend: Send + Sync {
    fn complete<'a>(
        &'a self,
        system_prompt: &'a str,
        prior_turns: &'a [ChatTurn],
        user_message: &'a str,
    ) -> GenerativeFuture<'a>;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GenerativeConfig) -> Result<Self, GenerativeError> {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.api_base.as_str().trim_end_matches('/'),
            config.model
        );
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| GenerativeError::Other(format!("invalid endpoint {endpoint}: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GenerativeError::Other(err.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    async fn generate(
        &self,
        system_prompt: &str,
        prior_turns: &[ChatTurn],
        user_message: &str,
    ) -> Result<String, GenerativeError> {
        let body = GenerateContentRequest::new(system_prompt, prior_turns, user_message);
        let response = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerativeError::from_message(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("{status}: {detail}");
            return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                GenerativeError::QuotaExceeded(message)
            } else {
                GenerativeError::from_message(message)
            });
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| GenerativeError::Other(format!("unreadable response: {err}")))?;
        parsed
            .into_text()
            .ok_or_else(|| GenerativeError::Other("response contained no text".to_string()))
    }
}

impl GenerativeBackend for GeminiClient {
    fn complete<'a>(
        &'a self,
        system_prompt: &'a str,
        prior_turns: &'a [ChatTurn],
        user_message: &'a str,
    ) -> GenerativeFuture<'a> {
        Box::pin(self.generate(system_prompt, prior_turns, user_message))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(system_prompt: &'a str, prior_turns: &'a [ChatTurn], user_message: &'a str) -> Self {
        let mut contents: Vec<Content<'a>> = prior_turns
            .iter()
            .filter(|turn| !turn.content.trim().is_empty())
            .map(|turn| Content {
                role: Some(gemini_role(&turn.role)),
                parts: vec![Part {
                    text: &turn.content,
                }],
            })
            .collect();
        contents.push(Content {
            role: Some("user"),
            parts: vec![Part { text: user_message }],
        });

        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt,
                }],
            },
            contents,
        }
    }
}

fn gemini_role(role: &str) -> &'static str {
    match role.trim().to_lowercase().as_str() {
        "assistant" | "model" | "bot" => "model",
        _ => "user",
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn quota_markers_classify_as_quota() {
        for message in [
            "429 Too Many Requests",
            "You exceeded your current QUOTA",
            "Billing account disabled",
        ] {
            assert!(GenerativeError::from_message(message).is_quota(), "{message}");
        }
        assert!(!GenerativeError::from_message("connection reset by peer").is_quota());
        assert!(!GenerativeError::from_message("500 Internal Server Error").is_quota());
    }

    #[test]
    fn request_maps_roles_and_appends_user_message() {
        let turns = vec![
            ChatTurn {
                role: "user".to_string(),
                content: "Is the river rising?".to_string(),
            },
            ChatTurn {
                role: "assistant".to_string(),
                content: "Slowly.".to_string(),
            },
            ChatTurn {
                role: "assistant".to_string(),
                content: "  ".to_string(),
            },
        ];
        let body = GenerateContentRequest::new("system", &turns, "Should I move my car?");
        let value = serde_json::to_value(&body).expect("request should serialize");
        assert_eq!(
            value,
            json!({
                "systemInstruction": {"parts": [{"text": "system"}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "Is the river rising?"}]},
                    {"role": "model", "parts": [{"text": "Slowly."}]},
                    {"role": "user", "parts": [{"text": "Should I move my car?"}]}
                ]
            })
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "Water is "}, {"text": "rising."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .expect("response should parse");
        assert_eq!(response.into_text().as_deref(), Some("Water is rising."));
    }

    #[test]
    fn empty_candidates_yield_no_text() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .expect("response should parse");
        assert!(response.into_text().is_none());
    }

    #[test]
    fn endpoint_includes_model_name() {
        let config = GenerativeConfig {
            api_key: "key".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_base: Url::parse("https://example.test/").expect("valid url"),
            timeout: std::time::Duration::from_secs(5),
        };
        let client = GeminiClient::new(&config).expect("client should build");
        assert_eq!(
            client.endpoint.as_str(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
