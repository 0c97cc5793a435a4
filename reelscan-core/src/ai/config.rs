//! AI configuration from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::http::{RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model to use.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default per-attempt HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

/// Client configuration.
#[derive(Clone)]
pub struct AiConfig {
    /// API key for the Gemini API.
    pub api_key: String,
    /// Model name (e.g., "gemini-2.5-flash").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Directory for caching responses. None disables caching.
    pub cache_dir: Option<PathBuf>,
    /// If true, only use cache, error if not cached.
    pub offline: bool,
    /// Attempts, backoff and retry eligibility.
    pub retry: RetryPolicy,
    /// Timeout for each HTTP attempt.
    pub timeout: Duration,
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("cache_dir", &self.cache_dir)
            .field("offline", &self.offline)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AiConfig {
    /// Configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: Some(Self::default_cache_dir()),
            offline: false,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY`: API key, unless offline
    ///
    /// Optional:
    /// - `REELSCAN_AI_MODEL`: Model name (default: "gemini-2.5-flash")
    /// - `REELSCAN_AI_BASE_URL`: API base URL
    /// - `REELSCAN_AI_CACHE_DIR`: Cache directory, or "none" to disable (default: "~/.reelscan/ai-cache")
    /// - `REELSCAN_AI_OFFLINE`: Use cache only (default: false)
    /// - `REELSCAN_MAX_ATTEMPTS`: Attempts per request (default: 5)
    /// - `REELSCAN_BASE_DELAY_MS`: First backoff delay in ms (default: 1000)
    /// - `REELSCAN_RETRY_REJECTED`: Retry rejected requests too (default: true)
    /// - `REELSCAN_HTTP_TIMEOUT_SECS`: Per-attempt timeout (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AiConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let offline = match lookup("REELSCAN_AI_OFFLINE") {
            Some(v) => parse_flag("REELSCAN_AI_OFFLINE", &v)?,
            None => false,
        };

        // Offline runs never reach the network, so the key is optional there
        let api_key = match lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            Some(key) => key,
            None if offline => String::new(),
            None => return Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string())),
        };

        let mut config = Self::new(api_key);
        config.offline = offline;

        if let Some(model) = lookup("REELSCAN_AI_MODEL") {
            config.model = model;
        }

        if let Some(base_url) = lookup("REELSCAN_AI_BASE_URL") {
            config.base_url = base_url;
        }

        config.cache_dir = cache_dir_from(&lookup);

        let max_attempts = parse_or(&lookup, "REELSCAN_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let base_delay_ms = parse_or(&lookup, "REELSCAN_BASE_DELAY_MS", DEFAULT_BASE_DELAY_MS)?;
        let retry_rejected = match lookup("REELSCAN_RETRY_REJECTED") {
            Some(v) => parse_flag("REELSCAN_RETRY_REJECTED", &v)?,
            None => true,
        };
        config.retry = RetryPolicy::new(max_attempts, Duration::from_millis(base_delay_ms))
            .with_retry_rejected(retry_rejected);

        let timeout_secs = parse_or(&lookup, "REELSCAN_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        config.timeout = Duration::from_secs(timeout_secs);

        Ok(config)
    }

    /// Full `generateContent` URL, including the key.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }

    /// Cache directory from `REELSCAN_AI_CACHE_DIR` alone, without requiring
    /// an API key. Used by cache maintenance commands.
    pub fn cache_dir_from_env() -> Option<PathBuf> {
        cache_dir_from(&|name: &str| env::var(name).ok())
    }

    /// Get the default cache directory: ~/.reelscan/ai-cache
    pub fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".reelscan").join("ai-cache"))
            .unwrap_or_else(|| PathBuf::from("data/ai-cache"))
    }
}

fn cache_dir_from<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("REELSCAN_AI_CACHE_DIR") {
        Some(val) if val == "none" => None,
        Some(path) => Some(PathBuf::from(path)),
        None => Some(AiConfig::default_cache_dir()),
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
