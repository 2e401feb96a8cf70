use std::time::Duration;

use studio_core::VIDEO_POLL_INTERVAL_MS;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";
/// Ten minutes at the default interval.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no API key configured (set API_KEY or GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// How often and how long a long-running operation is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(VIDEO_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    pub text: String,
    pub image: String,
    pub edit: String,
    pub video: String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
            edit: DEFAULT_EDIT_MODEL.to_string(),
            video: DEFAULT_VIDEO_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    api_key: Option<String>,
    pub base_url: String,
    pub models: ModelNames,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_media_bytes: u64,
    pub poll: PollSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: ModelNames::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_media_bytes: 100 * 1024 * 1024,
            poll: PollSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup; a missing key is not an error here.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.api_key = var("API_KEY").or_else(|| var("GEMINI_API_KEY"));
        if let Some(base_url) = var("GENAI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = var("GENAI_TEXT_MODEL") {
            config.models.text = model;
        }
        if let Some(model) = var("GENAI_IMAGE_MODEL") {
            config.models.image = model;
        }
        if let Some(model) = var("GENAI_EDIT_MODEL") {
            config.models.edit = model;
        }
        if let Some(model) = var("GENAI_VIDEO_MODEL") {
            config.models.video = model;
        }
        if let Some(value) = var("GENAI_REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_positive("GENAI_REQUEST_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = var("VIDEO_POLL_INTERVAL_MS") {
            let millis = parse_positive("VIDEO_POLL_INTERVAL_MS", &value)?;
            config.poll.interval = Duration::from_millis(millis);
        }
        if let Some(value) = var("VIDEO_MAX_POLL_ATTEMPTS") {
            let attempts = parse_positive("VIDEO_MAX_POLL_ATTEMPTS", &value)?;
            config.poll.max_attempts = u32::try_from(attempts).map_err(|_| ConfigError::InvalidValue {
                name: "VIDEO_MAX_POLL_ATTEMPTS",
                value,
            })?;
        }
        Ok(config)
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

/// Zero would disable a timeout, a poll interval or the only status check.
fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_number(name, value)? {
        0 => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
        number => Ok(number),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_poll_every_ten_seconds_with_a_ceiling() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.poll.interval, Duration::from_secs(10));
        assert_eq!(config.poll.max_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
        assert_eq!(config.api_key(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn api_key_falls_back_to_gemini_variable() {
        let config = EngineConfig::from_lookup(lookup(&[("API_KEY", " "), ("GEMINI_API_KEY", "g-key")]))
            .unwrap();
        assert_eq!(config.api_key(), Ok("g-key"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("API_KEY", "k"),
            ("GENAI_BASE_URL", "http://localhost:9000/"),
            ("VIDEO_POLL_INTERVAL_MS", "250"),
            ("VIDEO_MAX_POLL_ATTEMPTS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.poll.max_attempts, 4);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("VIDEO_MAX_POLL_ATTEMPTS", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "VIDEO_MAX_POLL_ATTEMPTS",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn zero_poll_attempts_are_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("VIDEO_MAX_POLL_ATTEMPTS", "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "VIDEO_MAX_POLL_ATTEMPTS",
                value: "0".to_string()
            }
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("VIDEO_POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "VIDEO_POLL_INTERVAL_MS",
                value: "0".to_string()
            }
        );
    }
}
