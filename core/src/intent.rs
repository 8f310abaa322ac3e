use serde::Serialize;
use utoipa::ToSchema;

/// Topic a free-text message is routed to when answering from the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Greeting,
    WaterLevel,
    FloodRisk,
    SensorStatus,
    Emergency,
    Report,
    Evacuation,
    Weather,
    Default,
}

impl IntentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Greeting => "greeting",
            IntentCategory::WaterLevel => "water_level",
            IntentCategory::FloodRisk => "flood_risk",
            IntentCategory::SensorStatus => "sensor_status",
            IntentCategory::Emergency => "emergency",
            IntentCategory::Report => "report",
            IntentCategory::Evacuation => "evacuation",
            IntentCategory::Weather => "weather",
            IntentCategory::Default => "default",
        }
    }
}

const GREETING_TERMS: &[&str] = &["hello", "hi", "good morning", "good evening"];
const SENSOR_TERMS: &[&str] = &["sensor", "status", "network"];
const EMERGENCY_TERMS: &[&str] = &["emergency", "alert", "urgent"];
const REPORT_TERMS: &[&str] = &["report", "analysis", "analyze"];
const EVACUATION_TERMS: &[&str] = &["evacuation", "evacuate", "shelter"];
const WEATHER_TERMS: &[&str] = &["weather", "rain", "storm"];

/// Classify a message by case-insensitive substring rules.
///
/// Rules are checked in a fixed order and the first match wins, so a message
/// that mentions several topics always lands on the earliest one below.
/// Matching is plain substring matching: "hi" also matches inside "this".
pub fn classify(message: &str) -> IntentCategory {
    let text = message.to_lowercase();
    let has = |term: &str| text.contains(term);

    if contains_any(&text, GREETING_TERMS) {
        IntentCategory::Greeting
    } else if (has("water") && has("level")) || has("water level") {
        IntentCategory::WaterLevel
    } else if has("flood") && (has("risk") || has("probability")) {
        IntentCategory::FloodRisk
    } else if contains_any(&text, SENSOR_TERMS) {
        IntentCategory::SensorStatus
    } else if contains_any(&text, EMERGENCY_TERMS) {
        IntentCategory::Emergency
    } else if contains_any(&text, REPORT_TERMS) {
        IntentCategory::Report
    } else if contains_any(&text, EVACUATION_TERMS) {
        IntentCategory::Evacuation
    } else if contains_any(&text, WEATHER_TERMS) {
        IntentCategory::Weather
    } else {
        IntentCategory::Default
    }
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}
