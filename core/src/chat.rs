use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which path produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Answered by the generative backend
    Generative,
    /// Classified and rendered from the knowledge base
    FallbackJson,
    /// Rendering failed; answered with the general overview
    FallbackJsonError,
    /// Every other path failed; fixed emergency text
    EmergencyFallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Generative => "generative",
            ResponseSource::FallbackJson => "fallback-json",
            ResponseSource::FallbackJsonError => "fallback-json-error",
            ResponseSource::EmergencyFallback => "emergency-fallback",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The question to answer. Missing or blank messages still get an answer.
    #[serde(default)]
    pub message: Option<String>,
    /// Earlier turns of the conversation, oldest first
    #[serde(default)]
    pub context: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SensorReading {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub metrics: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub sensors: Option<Vec<SensorReading>>,
}

/// Text produced for one request, before it is shaped for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub text: String,
    pub source: ResponseSource,
    pub timestamp: DateTime<Utc>,
    /// Diagnostic detail when a degraded path was taken
    pub error: Option<String>,
}

impl RenderedResponse {
    pub fn new(text: String, source: ResponseSource) -> Self {
        Self {
            text,
            source,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub source: ResponseSource,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RenderedResponse> for ChatResponse {
    fn from(rendered: RenderedResponse) -> Self {
        Self {
            response: rendered.text,
            source: rendered.source,
            timestamp: rendered.timestamp,
            error: rendered.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub analysis: String,
    pub source: ResponseSource,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RenderedResponse> for AnalysisResponse {
    fn from(rendered: RenderedResponse) -> Self {
        Self {
            analysis: rendered.text,
            source: rendered.source,
            timestamp: rendered.timestamp,
            error: rendered.error,
        }
    }
}
