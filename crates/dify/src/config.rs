// API connection settings

use std::fmt;
use std::time::Duration;

use refminer_core::ConfigError;

const DEFAULT_BASE_URL: &str = "https://api.dify.ai";
const DEFAULT_USER: &str = "refminer";

/// Endpoint, credentials and timeouts for a Dify-compatible API
#[derive(Clone)]
pub struct ApiConfig {
    /// Application API key, sent as a bearer token
    pub api_key: String,
    /// Base URL without the `/v1` suffix
    pub base_url: String,
    /// End-user identifier sent with every request
    pub user: String,
    /// TCP/TLS connect budget
    pub connect_timeout: Duration,
    /// Whole-request budget, including reading a streamed body
    pub request_timeout: Duration,
    /// Longest allowed gap between two streamed chunks
    pub idle_timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user: DEFAULT_USER.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// Load configuration from environment variables
    ///
    /// - `REFMINER_API_KEY` (required)
    /// - `REFMINER_BASE_URL` (default: https://api.dify.ai)
    /// - `REFMINER_USER` (default: refminer)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("REFMINER_API_KEY")
            .map_err(|_| ConfigError::invalid("REFMINER_API_KEY is not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("REFMINER_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(user) = std::env::var("REFMINER_USER") {
            config = config.with_user(user);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::invalid("API key must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout.is_zero() || self.idle_timeout.is_zero() {
            return Err(ConfigError::invalid("timeouts must be non-zero"));
        }
        Ok(())
    }

    /// Full URL for an API path such as `/v1/files/upload`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
