use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_KB_DIR: &str = "knowledge";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct GenerativeConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub kb_dir: PathBuf,
    pub kb_fallback_dir: PathBuf,
    /// Zone used to decide the time-of-day greeting bucket
    pub timezone: Tz,
    /// `None` when no API key is configured
    pub generative: Option<GenerativeConfig>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset or blank keys fall back to
    /// defaults; unparsable values are logged and replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT);

        let kb_dir = get("FLOODSENSE_KB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KB_DIR));
        let kb_fallback_dir = get("FLOODSENSE_KB_FALLBACK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join(DEFAULT_KB_DIR));

        let timezone = parse_or(get("FLOODSENSE_TIMEZONE"), "FLOODSENSE_TIMEZONE", Tz::UTC);

        let generative = get("GEMINI_API_KEY").map(|api_key| {
            let api_base = get("GEMINI_API_BASE")
                .and_then(|raw| match Url::parse(&raw) {
                    Ok(url) => Some(url),
                    Err(err) => {
                        tracing::warn!(value = %raw, error = %err, "invalid GEMINI_API_BASE; using default");
                        None
                    }
                })
                .unwrap_or_else(default_api_base);
            let timeout_secs = parse_or(
                get("FLOODSENSE_AI_TIMEOUT_SECS"),
                "FLOODSENSE_AI_TIMEOUT_SECS",
                DEFAULT_AI_TIMEOUT_SECS,
            );
            GenerativeConfig {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base,
                timeout: Duration::from_secs(timeout_secs.max(1)),
            }
        });

        let cors_origins = get("FLOODSENSE_CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            port,
            kb_dir,
            kb_fallback_dir,
            timezone,
            generative,
            cors_origins,
        }
    }
}

fn default_api_base() -> Url {
    Url::parse(DEFAULT_GEMINI_API_BASE).expect("default Gemini API base is a valid URL")
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            tracing::warn!(key, value = %raw, error = %err, "invalid configuration value; using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.kb_dir, PathBuf::from("knowledge"));
        assert_eq!(config.timezone, Tz::UTC);
        assert!(config.generative.is_none());
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn api_key_enables_generative_config() {
        let config = config(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("FLOODSENSE_AI_TIMEOUT_SECS", "5"),
        ]);
        let generative = config.generative.expect("generative config should be present");
        assert_eq!(generative.api_key, "secret");
        assert_eq!(generative.model, "gemini-pro");
        assert_eq!(generative.timeout, Duration::from_secs(5));
        assert_eq!(generative.api_base.as_str(), "https://generativelanguage.googleapis.com/");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config(&[
            ("PORT", "eighty"),
            ("FLOODSENSE_TIMEZONE", "Mars/Olympus"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_API_BASE", "not a url"),
            ("FLOODSENSE_AI_TIMEOUT_SECS", "-3"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.timezone, Tz::UTC);
        let generative = config.generative.expect("generative config should be present");
        assert_eq!(generative.timeout, Duration::from_secs(30));
        assert_eq!(generative.api_base.host_str(), Some("generativelanguage.googleapis.com"));
    }

    #[test]
    fn blank_api_key_disables_generative_backend() {
        let config = config(&[("GEMINI_API_KEY", "   ")]);
        assert!(config.generative.is_none());
    }

    #[test]
    fn parses_timezone_and_origins() {
        let config = config(&[
            ("FLOODSENSE_TIMEZONE", "Asia/Kolkata"),
            ("FLOODSENSE_CORS_ORIGINS", "https://a.example, ,https://b.example"),
        ]);
        assert_eq!(config.timezone, Tz::Asia__Kolkata);
        assert_eq!(config.cors_origins.len(), 2);
    }
}
