//! Per-request response resolution.
//!
//! A request is tried against the generative backend while the availability
//! breaker allows it, then answered from the knowledge base. Every path ends
//! in text: render failures degrade to the general overview and finally to a
//! fixed emergency message.

use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use floodsense_core::analysis::render_analysis;
use floodsense_core::availability::AvailabilityTracker;
use floodsense_core::chat::{AnalysisRequest, ChatRequest, ChatTurn, RenderedResponse, ResponseSource};
use floodsense_core::intent::{IntentCategory, classify};
use floodsense_core::knowledge::{DocumentName, KnowledgeBase};
use floodsense_core::render::{Renderer, TimeOfDay};
use serde_json::json;

use crate::generative::{GenerativeBackend, GenerativeError};

const SYSTEM_PROMPT: &str = "You are the assistant of a flood monitoring deployment. \
Answer questions about water levels, flood risk, the sensor network, alerts, evacuation and weather. \
Be concise and factual. If someone may be in danger, tell them to contact local emergency services.";

const ANALYSIS_PROMPT: &str = "Analyze the following flood monitoring data. \
Assess the flood risk, comment on the health of the sensor network and list up to three recommended actions.";

pub(crate) const EMERGENCY_TEXT: &str = "I'm having trouble reaching the flood monitoring data right now. \
If you are in immediate danger, move to higher ground and contact local emergency services.";

const EMERGENCY_ANALYSIS_TEXT: &str = "Flood Risk Analysis\n\n\
Analysis is temporarily unavailable. Continue monitoring water levels and follow guidance from local authorities.";

pub struct ResponseEngine {
    kb: Arc<KnowledgeBase>,
    availability: AvailabilityTracker,
    backend: Option<Arc<dyn GenerativeBackend>>,
    timezone: Tz,
}

impl ResponseEngine {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        backend: Option<Arc<dyn GenerativeBackend>>,
        timezone: Tz,
    ) -> Self {
        Self {
            kb,
            availability: AvailabilityTracker::new(),
            backend,
            timezone,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn availability(&self) -> &AvailabilityTracker {
        &self.availability
    }

    pub fn backend_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Wall-clock time in the configured zone.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    pub async fn respond_chat(&self, request: ChatRequest) -> RenderedResponse {
        let message = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty());
        let Some(message) = message else {
            tracing::warn!("chat request without a message");
            return self.degraded_chat("message is required".to_string());
        };

        let system_prompt = self.system_prompt();
        if let Some(text) = self
            .try_generative(&system_prompt, &request.context, message)
            .await
        {
            return RenderedResponse::new(text, ResponseSource::Generative);
        }

        let category = classify(message);
        match Renderer::new(&self.kb).render(category, message, self.local_now()) {
            Ok(text) => {
                tracing::debug!(category = category.as_str(), "answered from knowledge base");
                RenderedResponse::new(text, ResponseSource::FallbackJson)
            }
            Err(err) => {
                tracing::error!(category = category.as_str(), error = %err, "fallback rendering failed");
                self.degraded_chat(err.to_string())
            }
        }
    }

    pub async fn respond_analysis(&self, request: AnalysisRequest) -> RenderedResponse {
        let data = json!({
            "metrics": request.metrics,
            "sensors": request.sensors,
        });
        let prompt = format!("{ANALYSIS_PROMPT}\n\n{data}");
        if let Some(text) = self.try_generative(SYSTEM_PROMPT, &[], &prompt).await {
            return RenderedResponse::new(text, ResponseSource::Generative);
        }

        match render_analysis(
            &self.kb,
            request.metrics.as_deref(),
            request.sensors.as_deref(),
        ) {
            Ok(text) => RenderedResponse::new(text, ResponseSource::FallbackJson),
            Err(err) => {
                tracing::error!(error = %err, "analysis rendering failed");
                RenderedResponse::new(
                    EMERGENCY_ANALYSIS_TEXT.to_string(),
                    ResponseSource::EmergencyFallback,
                )
                .with_error(err.to_string())
            }
        }
    }

    /// Greeting for the current time of day. Never fails: a malformed
    /// greeting list is ignored in favour of the built-in greeting.
    pub fn greeting(&self) -> (TimeOfDay, String) {
        let now = self.local_now();
        let text = Renderer::new(&self.kb)
            .render(IntentCategory::Greeting, "", now)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "greeting list unusable; using built-in greeting");
                Renderer::new(&KnowledgeBase::default())
                    .render(IntentCategory::Greeting, "", now)
                    .unwrap_or_default()
            });
        (TimeOfDay::from_hour(now.hour()), text)
    }

    async fn try_generative(
        &self,
        system_prompt: &str,
        context: &[ChatTurn],
        message: &str,
    ) -> Option<String> {
        let backend = self.backend.as_ref()?;
        if !self.availability.is_enabled() {
            tracing::debug!("generative backend disabled; answering from knowledge base");
            return None;
        }

        match backend.complete(system_prompt, context, message).await {
            Ok(text) => {
                self.availability.record_success();
                Some(text)
            }
            Err(GenerativeError::QuotaExceeded(detail)) => {
                let outcome = self.availability.record_quota_failure();
                if outcome.tripped {
                    tracing::warn!(
                        failures = outcome.failures,
                        "generative backend disabled after repeated quota failures"
                    );
                } else {
                    tracing::warn!(failures = outcome.failures, detail = %detail, "generative quota failure");
                }
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "generative call failed; answering from knowledge base");
                None
            }
        }
    }

    fn degraded_chat(&self, error: String) -> RenderedResponse {
        match Renderer::new(&self.kb).render(classify(""), "", self.local_now()) {
            Ok(text) => RenderedResponse::new(text, ResponseSource::FallbackJsonError).with_error(error),
            Err(err) => {
                tracing::error!(error = %err, "overview rendering failed; using emergency text");
                RenderedResponse::new(EMERGENCY_TEXT.to_string(), ResponseSource::EmergencyFallback)
                    .with_error(format!("{error}; {err}"))
            }
        }
    }

    fn system_prompt(&self) -> String {
        let mut prompt = SYSTEM_PROMPT.to_string();
        if let Some(levels) = self.kb.get(DocumentName::FallbackData, &["floodRiskLevels"]) {
            prompt.push_str("\n\nFlood risk levels:\n");
            prompt.push_str(&serde_json::to_string(levels).unwrap_or_default());
        }
        if let Some(network) = self.kb.get(DocumentName::SensorStatus, &["network"]) {
            prompt.push_str("\n\nSensor network:\n");
            prompt.push_str(&serde_json::to_string(network).unwrap_or_default());
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use floodsense_core::chat::SensorReading;
    use floodsense_core::knowledge::KnowledgeValue;

    use super::*;
    use crate::generative::GenerativeFuture;

    /// Backend that replays scripted results and counts calls.
    struct ScriptedBackend {
        results: Mutex<VecDeque<Result<String, GenerativeError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(results: Vec<Result<String, GenerativeError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GenerativeBackend for ScriptedBackend {
        fn complete<'a>(
            &'a self,
            _system_prompt: &'a str,
            _prior_turns: &'a [ChatTurn],
            _user_message: &'a str,
        ) -> GenerativeFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .results
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(GenerativeError::Other("script exhausted".to_string())));
            Box::pin(async move { next })
        }
    }

    fn quota() -> Result<String, GenerativeError> {
        Err(GenerativeError::from_message("429 quota exceeded"))
    }

    fn chat(message: &str) -> ChatRequest {
        ChatRequest {
            message: Some(message.to_string()),
            context: Vec::new(),
        }
    }

    fn engine_with(kb: KnowledgeBase, backend: Option<Arc<ScriptedBackend>>) -> ResponseEngine {
        let backend = backend.map(|backend| backend as Arc<dyn GenerativeBackend>);
        ResponseEngine::new(Arc::new(kb), backend, Tz::UTC)
    }

    fn kb_from(doc: DocumentName, raw: serde_json::Value) -> KnowledgeBase {
        let value: KnowledgeValue = serde_json::from_value(raw).expect("knowledge value should parse");
        KnowledgeBase::from_documents([(doc, value)])
    }

    #[tokio::test]
    async fn generative_success_is_returned_and_resets_failures() {
        let backend = ScriptedBackend::new(vec![quota(), Ok("The river is calm.".to_string())]);
        let engine = engine_with(KnowledgeBase::default(), Some(backend.clone()));

        let first = engine.respond_chat(chat("water level?")).await;
        assert_eq!(first.source, ResponseSource::FallbackJson);
        assert_eq!(engine.availability().snapshot().consecutive_quota_failures, 1);

        let second = engine.respond_chat(chat("water level?")).await;
        assert_eq!(second.source, ResponseSource::Generative);
        assert_eq!(second.text, "The river is calm.");
        assert_eq!(engine.availability().snapshot().consecutive_quota_failures, 0);
    }

    #[tokio::test]
    async fn three_quota_failures_open_the_breaker_and_skip_the_backend() {
        let backend = ScriptedBackend::new(vec![quota(), quota(), quota(), Ok("unused".to_string())]);
        let engine = engine_with(KnowledgeBase::default(), Some(backend.clone()));

        for _ in 0..3 {
            let response = engine.respond_chat(chat("flood risk")).await;
            assert_eq!(response.source, ResponseSource::FallbackJson);
        }
        assert!(!engine.availability().is_enabled());

        let fourth = engine.respond_chat(chat("flood risk")).await;
        assert_eq!(fourth.source, ResponseSource::FallbackJson);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn other_failures_leave_the_breaker_untouched() {
        let backend = ScriptedBackend::new(vec![
            quota(),
            Err(GenerativeError::Other("timeout".to_string())),
        ]);
        let engine = engine_with(KnowledgeBase::default(), Some(backend));

        engine.respond_chat(chat("weather")).await;
        let response = engine.respond_chat(chat("weather")).await;
        assert_eq!(response.source, ResponseSource::FallbackJson);
        assert!(response.text.starts_with("Weather Conditions"));
        assert_eq!(engine.availability().snapshot().consecutive_quota_failures, 1);
        assert!(engine.availability().is_enabled());
    }

    #[tokio::test]
    async fn toggled_off_breaker_skips_the_backend() {
        let backend = ScriptedBackend::new(vec![Ok("unused".to_string())]);
        let engine = engine_with(KnowledgeBase::default(), Some(backend.clone()));
        engine.availability().toggle();

        let response = engine.respond_chat(chat("hello")).await;
        assert_eq!(response.source, ResponseSource::FallbackJson);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn missing_backend_answers_from_knowledge_base() {
        let engine = engine_with(KnowledgeBase::default(), None);
        let response = engine.respond_chat(chat("evacuation routes")).await;
        assert_eq!(response.source, ResponseSource::FallbackJson);
        assert!(response.text.starts_with("Evacuation Information"));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn missing_message_degrades_without_calling_backend() {
        let backend = ScriptedBackend::new(vec![Ok("unused".to_string())]);
        let engine = engine_with(KnowledgeBase::default(), Some(backend.clone()));

        for request in [ChatRequest::default(), chat("   ")] {
            let response = engine.respond_chat(request).await;
            assert_eq!(response.source, ResponseSource::FallbackJsonError);
            assert!(response.text.starts_with("Flood Monitoring System"));
            assert_eq!(response.error.as_deref(), Some("message is required"));
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn render_failure_degrades_to_overview() {
        let kb = kb_from(
            DocumentName::FallbackData,
            serde_json::json!({"floodRiskLevels": {"moderate": {"actions": "not a list"}}}),
        );
        let engine = engine_with(kb, None);
        let response = engine.respond_chat(chat("flood risk")).await;
        assert_eq!(response.source, ResponseSource::FallbackJsonError);
        assert!(response.text.starts_with("Flood Monitoring System"));
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|error| error.contains("floodRiskLevels.moderate.actions"))
        );
    }

    #[tokio::test]
    async fn broken_overview_ends_in_emergency_text() {
        let kb = kb_from(
            DocumentName::FallbackData,
            serde_json::json!({
                "floodRiskLevels": {"moderate": {"level": ["bad"]}},
                "systemOverview": {"capabilities": {"not": "a list"}}
            }),
        );
        let engine = engine_with(kb, None);
        let response = engine.respond_chat(chat("flood risk")).await;
        assert_eq!(response.source, ResponseSource::EmergencyFallback);
        assert_eq!(response.text, EMERGENCY_TEXT);
    }

    #[tokio::test]
    async fn analysis_falls_back_to_rendered_assessment() {
        let engine = engine_with(KnowledgeBase::default(), None);
        let sensors = (0..12)
            .map(|index| SensorReading {
                status: if index < 8 { "active" } else { "down" }.to_string(),
            })
            .collect();
        let response = engine
            .respond_analysis(AnalysisRequest {
                metrics: None,
                sensors: Some(sensors),
            })
            .await;
        assert_eq!(response.source, ResponseSource::FallbackJson);
        assert!(response.text.contains("Level: Moderate"));
        assert!(!response.text.contains("Data Quality"));
    }

    #[tokio::test]
    async fn malformed_risk_row_ends_analysis_in_emergency_text() {
        let kb = kb_from(
            DocumentName::FallbackData,
            serde_json::json!({"floodRiskLevels": {"low": {"actions": 5}}}),
        );
        let engine = engine_with(kb, None);
        let response = engine.respond_analysis(AnalysisRequest::default()).await;
        assert_eq!(response.source, ResponseSource::EmergencyFallback);
        assert_eq!(response.text, EMERGENCY_ANALYSIS_TEXT);
        assert!(
            response
                .error
                .as_deref()
                .is_some_and(|error| error.contains("floodRiskLevels.low.actions"))
        );
    }

    #[tokio::test]
    async fn blank_greeting_entries_never_produce_empty_chat() {
        let kb = kb_from(
            DocumentName::Greetings,
            serde_json::json!({"greetings": {
                "morning": [""], "afternoon": [""], "evening": [""], "night": [" "]
            }}),
        );
        let engine = engine_with(kb, None);
        let response = engine.respond_chat(chat("hello")).await;
        assert_eq!(response.source, ResponseSource::FallbackJson);
        assert!(!response.text.trim().is_empty());
    }

    #[tokio::test]
    async fn analysis_uses_generative_backend_when_available() {
        let backend = ScriptedBackend::new(vec![Ok("Risk is low.".to_string())]);
        let engine = engine_with(KnowledgeBase::default(), Some(backend));
        let response = engine.respond_analysis(AnalysisRequest::default()).await;
        assert_eq!(response.source, ResponseSource::Generative);
        assert_eq!(response.text, "Risk is low.");
    }

    #[test]
    fn greeting_survives_malformed_greeting_list() {
        let kb = kb_from(DocumentName::Greetings, serde_json::json!({"greetings": {
                "morning": 1, "afternoon": 1, "evening": 1, "night": 1
            }}));
        let engine = engine_with(kb, None);
        let (_, text) = engine.greeting();
        assert!(!text.is_empty());
        assert!(!text.contains("{{"));
    }
}
