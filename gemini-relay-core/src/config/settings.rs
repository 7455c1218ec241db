//! Settings configuration loaded from an optional TOML file.
//!
//! The file path comes from `RELAY_CONFIG`. When unset, built-in defaults
//! are used. Individual values can then be overridden through environment
//! variables, which is how container deployments usually configure the relay.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable pointing at the TOML settings file.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Model used when neither the file nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Example settings file
///
/// ```toml
/// [gateway]
/// host = "0.0.0.0"
/// port = 3000
/// body_limit_bytes = 10485760
///
/// [upstream]
/// model = "gemini-2.5-flash-preview-05-20"
/// timeout_secs = 20
///
/// [retry]
/// max_attempts = 3
/// backoff_base_ms = 300
/// retry_empty_reply = true
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Upstream API configuration
    #[serde(default)]
    pub upstream: UpstreamSettings,

    /// Retry loop configuration
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Gateway server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Host to bind to
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Maximum accepted request body size. Inline images make requests large.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

/// Upstream generative API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamSettings {
    /// Model identifier placed in the request path
    #[serde(default = "default_model")]
    pub model: String,

    /// API root, overridable for tests and proxies
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Retry settings for generation requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay; attempt n waits `base * 2^(n-1)` before the next one
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Retry when the upstream answers 2xx without any reply text.
    /// When false, such answers are returned as the fallback reply.
    #[serde(default = "default_retry_empty_reply")]
    pub retry_empty_reply: bool,
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_body_limit_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    300
}

fn default_retry_empty_reply() -> bool {
    true
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            retry_empty_reply: default_retry_empty_reply(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl Settings {
    /// Load settings from the file named by `RELAY_CONFIG` (if any), then
    /// apply environment overrides and validate.
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a settings file.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        tracing::info!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Override file values with any `RELAY_*` / `PORT` variables that are set.
    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        if let Some(host) = env_string("RELAY_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            self.gateway.port = port;
        }
        if let Some(limit) = env_parse("RELAY_BODY_LIMIT_BYTES")? {
            self.gateway.body_limit_bytes = limit;
        }
        if let Some(model) = env_string("RELAY_MODEL") {
            self.upstream.model = model;
        }
        if let Some(base_url) = env_string("RELAY_UPSTREAM_BASE_URL") {
            self.upstream.base_url = base_url;
        }
        if let Some(timeout) = env_parse("RELAY_TIMEOUT_SECS")? {
            self.upstream.timeout_secs = timeout;
        }
        if let Some(attempts) = env_parse("RELAY_MAX_ATTEMPTS")? {
            self.retry.max_attempts = attempts;
        }
        if let Some(base) = env_parse("RELAY_BACKOFF_BASE_MS")? {
            self.retry.backoff_base_ms = base;
        }
        if let Some(retry_empty) = env_parse("RELAY_RETRY_EMPTY_REPLY")? {
            self.retry.retry_empty_reply = retry_empty;
        }
        Ok(())
    }

    /// Reject values the dispatcher cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.retry.max_attempts == 0 {
            return Err(SettingsError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_base_ms == 0 {
            return Err(SettingsError::Invalid(
                "retry.backoff_base_ms must be positive".to_string(),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "upstream.timeout_secs must be positive".to_string(),
            ));
        }
        if self.gateway.body_limit_bytes == 0 {
            return Err(SettingsError::Invalid(
                "gateway.body_limit_bytes must be positive".to_string(),
            ));
        }
        if self.upstream.model.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "upstream.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, SettingsError> {
    let Some(raw) = env_string(name) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| SettingsError::InvalidEnv {
            name: name.to_string(),
            value: raw,
        })
}
