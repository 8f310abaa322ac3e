//! Deterministic answers assembled from the knowledge base.
//!
//! Every section has a built-in default so an empty knowledge base still
//! produces a complete answer. A value that is present but has the wrong
//! shape is reported as [`RenderError::Malformed`] instead of being guessed at.

use chrono::{NaiveDateTime, Timelike};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use utoipa::ToSchema;

use crate::intent::IntentCategory;
use crate::knowledge::{DocumentName, KnowledgeBase, KnowledgeValue};
use crate::template::{self, GREETING_VALUES, Placeholder};

/// Risk table entry used for the chat flood-risk answer.
pub const CURRENT_RISK_KEY: &str = "moderate";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("knowledge value {document}:{path} should be a {expected}, found {found}")]
    Malformed {
        document: DocumentName,
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

/// One row of the flood risk table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskEntry {
    pub level: String,
    pub probability: String,
    pub description: String,
    pub actions: Vec<String>,
}

fn default_risk(key: &str) -> (&'static str, &'static str, &'static str) {
    match key {
        "low" => (
            "Low",
            "0-20%",
            "Water levels are within normal range and no significant rainfall is expected.",
        ),
        "high" => (
            "High",
            "60-80%",
            "Water levels are approaching warning thresholds and flooding is likely in low-lying areas.",
        ),
        "critical" => (
            "Critical",
            "80-100%",
            "Flooding is imminent or already occurring.",
        ),
        _ => (
            "Moderate",
            "20-60%",
            "Water levels are elevated and conditions are being monitored closely.",
        ),
    }
}

pub struct Renderer<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> Renderer<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn render(
        &self,
        category: IntentCategory,
        message: &str,
        now: NaiveDateTime,
    ) -> Result<String, RenderError> {
        self.render_with_rng(category, message, now, &mut rand::thread_rng())
    }

    pub fn render_with_rng<R: Rng + ?Sized>(
        &self,
        category: IntentCategory,
        message: &str,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> Result<String, RenderError> {
        match category {
            IntentCategory::Greeting => self.greeting(TimeOfDay::from_hour(now.hour()), rng),
            IntentCategory::WaterLevel => self.water_level(),
            IntentCategory::FloodRisk => self.flood_risk(),
            IntentCategory::SensorStatus => self.sensor_status(now),
            IntentCategory::Emergency => self.emergency(),
            IntentCategory::Report => self.report(message, now),
            IntentCategory::Evacuation => self.evacuation(),
            IntentCategory::Weather => self.weather(),
            IntentCategory::Default => self.overview(),
        }
    }

    /// Pick one greeting for the bucket at random and fill in its placeholders.
    /// Blank entries are never picked; a bucket with no usable entry gets the
    /// built-in greeting.
    pub fn greeting<R: Rng + ?Sized>(
        &self,
        time_of_day: TimeOfDay,
        rng: &mut R,
    ) -> Result<String, RenderError> {
        let mut greetings = self.texts(
            DocumentName::Greetings,
            &["greetings", time_of_day.as_str()],
        )?;
        greetings.retain(|greeting| !greeting.trim().is_empty());
        let chosen = match greetings.choose(rng) {
            Some(greeting) => greeting.clone(),
            None => default_greeting(time_of_day),
        };
        Ok(template::fill(&chosen, &GREETING_VALUES))
    }

    /// Read a risk table row, filling absent fields from the built-in table.
    pub fn risk_entry(&self, key: &str) -> Result<RiskEntry, RenderError> {
        let doc = DocumentName::FallbackData;
        let (level, probability, description) = default_risk(key);
        Ok(RiskEntry {
            level: self.text(doc, &["floodRiskLevels", key, "level"], level)?,
            probability: self.text(doc, &["floodRiskLevels", key, "probability"], probability)?,
            description: self.text(doc, &["floodRiskLevels", key, "description"], description)?,
            actions: self.texts(doc, &["floodRiskLevels", key, "actions"])?,
        })
    }

    fn water_level(&self) -> Result<String, RenderError> {
        let doc = DocumentName::FallbackData;
        let current = self.text(doc, &["waterLevel", "current"], "2.4m")?;
        let normal = self.text(doc, &["waterLevel", "normalRange"], "1.5m - 2.5m")?;
        let warning = self.text(doc, &["waterLevel", "warningLevel"], "3.5m")?;
        let danger = self.text(doc, &["waterLevel", "dangerLevel"], "4.5m")?;
        let trend = self.text(doc, &["waterLevel", "trend"], "Stable")?;
        let note = self.text(
            doc,
            &["waterLevel", "note"],
            "Levels are within the normal range for this time of year.",
        )?;

        Ok(format!(
            "Water Level Status\n\n\
             Current Level: {current}\n\
             Normal Range: {normal}\n\
             Warning Level: {warning}\n\
             Danger Level: {danger}\n\
             Trend: {trend}\n\n\
             {note}"
        ))
    }

    fn flood_risk(&self) -> Result<String, RenderError> {
        let risk = self.risk_entry(CURRENT_RISK_KEY)?;
        let actions = if risk.actions.is_empty() {
            "Continue routine monitoring".to_string()
        } else {
            first(&risk.actions, 2).join(", ")
        };

        Ok(format!(
            "Flood Risk Assessment\n\n\
             Level: {}\n\
             Probability: {}\n\
             {}\n\n\
             Recommended Actions: {actions}",
            risk.level, risk.probability, risk.description
        ))
    }

    fn sensor_status(&self, now: NaiveDateTime) -> Result<String, RenderError> {
        let doc = DocumentName::SensorStatus;
        let total = self.text(doc, &["network", "total"], "15")?;
        let active = self.text(doc, &["network", "active"], "12")?;
        let offline = self.text(doc, &["network", "offline"], "3")?;
        let health = self.text(doc, &["network", "health"], "Operational")?;
        let maintenance = self.texts(doc, &["network", "maintenance"])?;

        let mut text = format!(
            "Sensor Network Status\n\n\
             Active Sensors: {active}/{total}\n\
             Offline Sensors: {offline}\n\
             Network Health: {health}\n\
             Last Checked: {}",
            now.format(TIMESTAMP_FORMAT)
        );
        if !maintenance.is_empty() {
            text.push_str("\n\nMaintenance Notes:");
            push_bullets(&mut text, first(&maintenance, 3));
        }
        Ok(text)
    }

    fn emergency(&self) -> Result<String, RenderError> {
        let doc = DocumentName::Alerts;
        let level = self.text(doc, &["current", "level"], "No active alerts")?;
        let message = self.text(doc, &["current", "message"], "")?;
        let mut procedures = self.texts(doc, &["emergency", "procedures"])?;
        if procedures.is_empty() {
            procedures = [
                "Move to higher ground immediately",
                "Follow instructions from local authorities",
                "Avoid walking or driving through flood water",
            ]
            .map(String::from)
            .to_vec();
        }
        let mut contacts = self.pairs(doc, &["emergency", "contacts"])?;
        if contacts.is_empty() {
            contacts.push(("Emergency Services".to_string(), "112".to_string()));
        }

        let mut text = format!("Emergency Information\n\nCurrent Alert: {level}");
        if !message.is_empty() {
            text.push('\n');
            text.push_str(&message);
        }
        text.push_str("\n\nImmediate Steps:");
        for (index, step) in first(&procedures, 3).iter().enumerate() {
            text.push_str(&format!("\n{}. {step}", index + 1));
        }
        text.push_str("\n\nEmergency Contacts:");
        for (name, number) in &contacts {
            text.push_str(&format!("\n- {name}: {number}"));
        }
        Ok(text)
    }

    fn report(&self, message: &str, now: NaiveDateTime) -> Result<String, RenderError> {
        let doc = DocumentName::Reports;
        let summary = self.text(
            doc,
            &["templates", "summary"],
            "Summary prepared for your request: \"{{message}}\".",
        )?;
        let mut findings = self.texts(doc, &["findings"])?;
        if findings.is_empty() {
            findings = [
                "Water levels are within the normal range",
                "12 of 15 sensors are reporting",
                "No active flood warnings",
            ]
            .map(String::from)
            .to_vec();
        }

        let mut text = format!(
            "Flood Monitoring Report\nGenerated: {}\n\n{}\n\nKey Findings:",
            now.format(TIMESTAMP_FORMAT),
            template::fill(&summary, &[(Placeholder::Message, message)])
        );
        push_bullets(&mut text, first(&findings, 3));
        Ok(text)
    }

    fn evacuation(&self) -> Result<String, RenderError> {
        let doc = DocumentName::FallbackData;
        let instructions = self.text(
            doc,
            &["evacuation", "instructions"],
            "No evacuation order is currently in effect. Keep an emergency kit ready and know your route to higher ground.",
        )?;
        let mut routes = self.texts(doc, &["evacuation", "routes"])?;
        if routes.is_empty() {
            routes.push("Follow posted evacuation signs toward higher ground".to_string());
        }
        let mut shelters = self.texts(doc, &["evacuation", "shelters"])?;
        if shelters.is_empty() {
            shelters.push("Contact local authorities for the nearest open shelter".to_string());
        }

        let mut text = format!("Evacuation Information\n\n{instructions}\n\nEvacuation Routes:");
        push_bullets(&mut text, first(&routes, 3));
        text.push_str("\n\nEmergency Shelters:");
        push_bullets(&mut text, first(&shelters, 3));
        Ok(text)
    }

    fn weather(&self) -> Result<String, RenderError> {
        let doc = DocumentName::FallbackData;
        let current = self.text(doc, &["weather", "current"], "Partly cloudy")?;
        let forecast = self.text(
            doc,
            &["weather", "forecast"],
            "Light rain expected over the next 48 hours",
        )?;
        let rainfall = self.text(doc, &["weather", "rainfall"], "12mm")?;
        let impact = self.text(
            doc,
            &["weather", "impact"],
            "Low. Current rainfall is unlikely to cause flooding.",
        )?;

        Ok(format!(
            "Weather Conditions\n\n\
             Current: {current}\n\
             Forecast: {forecast}\n\
             Rainfall (24h): {rainfall}\n\
             Flood Impact: {impact}"
        ))
    }

    fn overview(&self) -> Result<String, RenderError> {
        let doc = DocumentName::FallbackData;
        let description = self.text(
            doc,
            &["systemOverview", "description"],
            "This system monitors water levels through a network of IoT sensors and provides flood risk assessments, alerts and guidance.",
        )?;
        let mut capabilities = self.texts(doc, &["systemOverview", "capabilities"])?;
        if capabilities.is_empty() {
            capabilities = [
                "Current water levels",
                "Flood risk assessment",
                "Sensor network status",
                "Emergency procedures and alerts",
                "Evacuation routes and shelters",
                "Weather conditions",
            ]
            .map(String::from)
            .to_vec();
        }

        let mut text = format!("Flood Monitoring System\n\n{description}\n\nI can help with:");
        push_bullets(&mut text, &capabilities);
        Ok(text)
    }

    fn text(&self, doc: DocumentName, path: &[&str], default: &str) -> Result<String, RenderError> {
        match self.kb.get(doc, path) {
            None => Ok(default.to_string()),
            Some(value) => value
                .as_text()
                .ok_or_else(|| malformed(doc, path, "string", value)),
        }
    }

    fn texts(&self, doc: DocumentName, path: &[&str]) -> Result<Vec<String>, RenderError> {
        let Some(value) = self.kb.get(doc, path) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_list()
            .ok_or_else(|| malformed(doc, path, "list", value))?;
        items
            .iter()
            .map(|item| {
                item.as_text()
                    .ok_or_else(|| malformed(doc, path, "list of strings", item))
            })
            .collect()
    }

    fn pairs(&self, doc: DocumentName, path: &[&str]) -> Result<Vec<(String, String)>, RenderError> {
        let Some(value) = self.kb.get(doc, path) else {
            return Ok(Vec::new());
        };
        let map = value
            .as_map()
            .ok_or_else(|| malformed(doc, path, "mapping", value))?;
        map.iter()
            .map(|(key, item)| {
                item.as_text()
                    .map(|text| (key.clone(), text))
                    .ok_or_else(|| malformed(doc, path, "mapping of strings", item))
            })
            .collect()
    }
}

fn default_greeting(time_of_day: TimeOfDay) -> String {
    let opener = match time_of_day {
        TimeOfDay::Night => "Hello".to_string(),
        bucket => format!("Good {}", bucket.as_str()),
    };
    format!(
        "{opener}! I'm your flood monitoring assistant. The current flood risk is {{{{riskLevel}}}} and the system is {{{{status}}}}."
    )
}

fn malformed(
    document: DocumentName,
    path: &[&str],
    expected: &'static str,
    found: &KnowledgeValue,
) -> RenderError {
    RenderError::Malformed {
        document,
        path: path.join("."),
        expected,
        found: found.kind(),
    }
}

fn first(items: &[String], count: usize) -> &[String] {
    &items[..items.len().min(count)]
}

fn push_bullets(text: &mut String, items: &[String]) {
    for item in items {
        text.push_str("\n- ");
        text.push_str(item);
    }
}
