//! Configuration management for gemini-relay.
//!
//! Secrets come from environment variables, settings from an optional TOML
//! file with environment overrides.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `GEMINI_API_KEY` - upstream API key (required)
//!
//! ## Settings
//! - `RELAY_CONFIG` - path to a TOML settings file (optional)
//! - `RELAY_HOST`, `PORT`, `RELAY_BODY_LIMIT_BYTES`
//! - `RELAY_MODEL`, `RELAY_UPSTREAM_BASE_URL`, `RELAY_TIMEOUT_SECS`
//! - `RELAY_MAX_ATTEMPTS`, `RELAY_BACKOFF_BASE_MS`, `RELAY_RETRY_EMPTY_REPLY`

mod secrets;
mod settings;

use std::time::Duration;

use crate::retry::RetryConfig;

pub use secrets::{GEMINI_API_KEY_ENV, Secrets, SecretsError};
pub use settings::{
    CONFIG_PATH_ENV, DEFAULT_MODEL, GatewaySettings, RetrySettings, Settings, SettingsError,
    UpstreamSettings,
};

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Combined configuration containing both secrets and settings.
///
/// Built once in `main` and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML and environment overrides
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `GEMINI_API_KEY` is missing or blank
    /// - the settings file cannot be read or parsed
    /// - an override variable does not parse or a value is out of range
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;
        Ok(Self { secrets, settings })
    }

    /// Snapshot of the retry policy for the dispatcher.
    pub fn retry_config(&self) -> RetryConfig {
        let retry = &self.settings.retry;
        RetryConfig {
            max_attempts: retry.max_attempts,
            backoff_base: Duration::from_millis(retry.backoff_base_ms),
            request_timeout: Duration::from_secs(self.settings.upstream.timeout_secs),
            retry_empty_reply: retry.retry_empty_reply,
        }
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        self.settings.bind_addr()
    }

    /// Get the Gemini API key.
    pub fn gemini_api_key(&self) -> &str {
        &self.secrets.gemini_api_key
    }

    /// Get the configured model identifier.
    pub fn model(&self) -> &str {
        &self.settings.upstream.model
    }
}

/// Load .env file if it exists (for development convenience).
///
/// This is called automatically by `Config::load()` but is also
/// exported for use in other contexts.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
