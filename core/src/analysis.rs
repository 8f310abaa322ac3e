//! Fallback text for the analysis endpoint.

use crate::chat::SensorReading;
use crate::knowledge::KnowledgeBase;
use crate::render::{RenderError, Renderer};

/// Assumed counts when the request carries no sensor list.
const DEFAULT_ACTIVE_SENSORS: usize = 10;
const DEFAULT_TOTAL_SENSORS: usize = 12;

/// Below this share of active sensors the risk is reported as moderate.
const MODERATE_RISK_ACTIVE_RATIO: f64 = 0.8;
/// Above this share of active sensors submitted metrics count as good quality.
const GOOD_QUALITY_ACTIVE_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSnapshot {
    pub active: usize,
    pub total: usize,
}

impl NetworkSnapshot {
    /// Count active sensors. Only an absent list uses the assumed 10/12
    /// counts; an empty list is taken as given (0/0, which selects "low").
    pub fn from_sensors(sensors: Option<&[SensorReading]>) -> Self {
        match sensors {
            Some(sensors) => Self {
                active: sensors
                    .iter()
                    .filter(|sensor| sensor.status == "active")
                    .count(),
                total: sensors.len(),
            },
            None => Self {
                active: DEFAULT_ACTIVE_SENSORS,
                total: DEFAULT_TOTAL_SENSORS,
            },
        }
    }

    /// Key of the risk table row that applies to this network.
    pub fn risk_key(self) -> &'static str {
        if (self.active as f64) < MODERATE_RISK_ACTIVE_RATIO * self.total as f64 {
            "moderate"
        } else {
            "low"
        }
    }

    pub fn data_quality(self) -> &'static str {
        if self.active as f64 > GOOD_QUALITY_ACTIVE_RATIO * self.total as f64 {
            "Good"
        } else {
            "Fair"
        }
    }

    fn coverage_percent(self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.active * 100 + self.total / 2) / self.total
        }
    }
}

pub fn render_analysis(
    kb: &KnowledgeBase,
    metrics: Option<&[serde_json::Value]>,
    sensors: Option<&[SensorReading]>,
) -> Result<String, RenderError> {
    let network = NetworkSnapshot::from_sensors(sensors);
    let risk = Renderer::new(kb).risk_entry(network.risk_key())?;

    let mut text = format!(
        "Flood Risk Analysis\n\n\
         Risk Assessment:\n\
         Level: {}\n\
         Probability: {}\n\
         {}\n\n\
         Sensor Network:\n\
         Active Sensors: {}/{}\n\
         Network Coverage: {}%",
        risk.level,
        risk.probability,
        risk.description,
        network.active,
        network.total,
        network.coverage_percent()
    );

    if let Some(metrics) = metrics.filter(|metrics| !metrics.is_empty()) {
        text.push_str(&format!(
            "\n\nMetrics Analysis:\nData Points Analyzed: {}\nData Quality: {}",
            metrics.len(),
            network.data_quality()
        ));
    }

    if !risk.actions.is_empty() {
        text.push_str("\n\nRecommended Actions:");
        for (index, action) in risk.actions.iter().take(3).enumerate() {
            text.push_str(&format!("\n{}. {action}", index + 1));
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::knowledge::DocumentName;

    fn sensors(active: usize, down: usize) -> Vec<SensorReading> {
        let status = |value: &str| SensorReading {
            status: value.to_string(),
        };
        std::iter::repeat_with(|| status("active"))
            .take(active)
            .chain(std::iter::repeat_with(|| status("down")).take(down))
            .collect()
    }

    fn risk_kb() -> KnowledgeBase {
        KnowledgeBase::from_documents([(
            DocumentName::FallbackData,
            serde_json::from_value(json!({"floodRiskLevels": {
                "low": {"level": "Low", "probability": "10%", "description": "calm", "actions": ["watch"]},
                "moderate": {"level": "Moderate", "probability": "40%", "description": "elevated",
                             "actions": ["a", "b", "c", "d"]}
            }}))
            .expect("risk table should parse"),
        )])
    }

    #[test]
    fn absent_sensors_use_default_counts() {
        let network = NetworkSnapshot::from_sensors(None);
        assert_eq!(network, NetworkSnapshot { active: 10, total: 12 });
        // 10 >= 9.6
        assert_eq!(network.risk_key(), "low");
    }

    #[test]
    fn eight_of_twelve_active_selects_moderate_without_metrics_block() {
        let readings = sensors(8, 4);
        let text = render_analysis(&risk_kb(), None, Some(readings.as_slice()))
            .expect("analysis renders");
        assert!(text.contains("Level: Moderate"));
        assert!(text.contains("Active Sensors: 8/12"));
        assert!(!text.contains("Data Quality"));
        assert!(text.contains("3. c"));
        assert!(!text.contains("4. d"));
    }

    #[test]
    fn metrics_block_reports_count_and_quality() {
        let readings = sensors(8, 4);
        let metrics = vec![json!({"level": 2.1}), json!({"level": 2.3})];
        let text = render_analysis(&risk_kb(), Some(metrics.as_slice()), Some(readings.as_slice()))
            .expect("analysis renders");
        assert!(text.contains("Data Points Analyzed: 2"));
        // 8 <= 8.4
        assert!(text.contains("Data Quality: Fair"));

        let healthy = sensors(12, 0);
        let text = render_analysis(&risk_kb(), Some(metrics.as_slice()), Some(healthy.as_slice()))
            .expect("analysis renders");
        assert!(text.contains("Level: Low"));
        assert!(text.contains("Data Quality: Good"));
        assert!(text.contains("1. watch"));
    }

    #[test]
    fn empty_metrics_are_treated_as_absent() {
        let text = render_analysis(&risk_kb(), Some(&[][..]), None).expect("analysis renders");
        assert!(!text.contains("Metrics Analysis"));
    }

    #[test]
    fn empty_sensor_list_does_not_divide_by_zero() {
        let text = render_analysis(&KnowledgeBase::default(), None, Some(&[][..]))
            .expect("analysis renders");
        assert!(text.contains("Active Sensors: 0/0"));
        assert!(text.contains("Network Coverage: 0%"));
        assert!(!text.contains("Recommended Actions"));
    }
}
