//! Model service endpoints and generation parameters.

use std::time::Duration;

const DEFAULT_SERVICE_URL: &str = "http://localhost:8001";

/// Sampling parameters for the storyboard text model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextGenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for TextGenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 2500,
            temperature: 0.7,
        }
    }
}

/// Configuration for the model service clients.
///
/// Each service URL falls back to `ML_SERVICE_URL`, so a single host
/// serving every model needs only one variable.
#[derive(Debug, Clone)]
pub struct MlServicesConfig {
    pub transcribe_url: String,
    pub text_url: String,
    pub image_url: String,
    pub video_url: String,
    /// Per-request timeout; video synthesis is the slowest call
    pub timeout: Duration,
    pub max_retries: u32,
    pub text: TextGenerationParams,
}

impl Default for MlServicesConfig {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_SERVICE_URL)
    }
}

impl MlServicesConfig {
    /// Point every service at one base URL.
    pub fn with_base_url(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            transcribe_url: base.clone(),
            text_url: base.clone(),
            image_url: base.clone(),
            video_url: base,
            timeout: Duration::from_secs(900),
            max_retries: 2,
            text: TextGenerationParams::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let base = std::env::var("ML_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string());
        let service = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| base.clone())
                .trim_end_matches('/')
                .to_string()
        };
        let defaults = TextGenerationParams::default();

        Self {
            transcribe_url: service("TRANSCRIBE_SERVICE_URL"),
            text_url: service("TEXT_SERVICE_URL"),
            image_url: service("IMAGE_SERVICE_URL"),
            video_url: service("VIDEO_SERVICE_URL"),
            timeout: Duration::from_secs(env_parse("ML_SERVICE_TIMEOUT").unwrap_or(900)),
            max_retries: env_parse("ML_SERVICE_RETRIES").unwrap_or(2),
            text: TextGenerationParams {
                max_new_tokens: env_parse("TEXT_MAX_NEW_TOKENS").unwrap_or(defaults.max_new_tokens),
                temperature: env_parse("TEXT_TEMPERATURE").unwrap_or(defaults.temperature),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
