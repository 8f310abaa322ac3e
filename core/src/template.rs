//! Placeholder substitution for knowledge-base strings.

/// Tokens that may appear inside knowledge-base strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    RiskLevel,
    Status,
    SensorStatus,
    Message,
}

impl Placeholder {
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::RiskLevel => "{{riskLevel}}",
            Placeholder::Status => "{{status}}",
            Placeholder::SensorStatus => "{{sensorStatus}}",
            Placeholder::Message => "{{message}}",
        }
    }
}

/// Values substituted into greetings. These are fixed literals, not live readings.
pub const GREETING_VALUES: [(Placeholder, &str); 3] = [
    (Placeholder::RiskLevel, "low"),
    (Placeholder::Status, "operational"),
    (Placeholder::SensorStatus, "12/15 active"),
];

/// Replace every occurrence of the given tokens. Unknown `{{...}}` tokens stay as written.
pub fn fill(template: &str, values: &[(Placeholder, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |text, (placeholder, value)| {
            text.replace(placeholder.token(), value)
        })
}
