use std::env;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 20;

/// Connection settings for the planning backend and the weather service.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub backend_url: String,
    pub backend_prefix: String,
    pub http_timeout: Duration,
    pub openweather_api_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_prefix: String::new(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
            openweather_api_key: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let backend_url = env::var("ITINERA_BACKEND_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_prefix = env::var("ITINERA_BACKEND_PREFIX").unwrap_or_default();
        let http_timeout = Duration::from_secs(
            env::var("ITINERA_HTTP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|seconds| *seconds > 0)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
        );
        let openweather_api_key = env::var("OPENWEATHER_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            backend_url,
            backend_prefix,
            http_timeout,
            openweather_api_key,
        }
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }
}

/// `"api/"` → `"/api"`, blank → `""`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
