//! Secrets configuration loaded from environment variables only.
//!
//! The Gemini API key is the only secret the relay needs. It is never read
//! from the settings file so it cannot end up in version control.

use std::env;

/// Environment variable holding the upstream API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Secrets loaded exclusively from environment variables.
#[derive(Clone, Default)]
pub struct Secrets {
    /// Gemini API key (env: GEMINI_API_KEY)
    pub gemini_api_key: String,
}

// Keep the key out of `{:?}` output (config is logged at startup).
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("gemini_api_key", &"[redacted]")
            .finish()
    }
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// Loads a `.env` file first if present (development convenience).
    pub fn from_env() -> Result<Self, SecretsError> {
        super::load_dotenv();

        Self::from_env_inner()
    }

    /// Internal method to load from environment without loading .env
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        let gemini_api_key = env::var(GEMINI_API_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SecretsError::MissingSecret(GEMINI_API_KEY_ENV.to_string()))?;

        Ok(Self { gemini_api_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_MUTEX;

    #[test]
    fn test_secrets_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var(GEMINI_API_KEY_ENV, "  gm-test  ") }

        let secrets = Secrets::from_env_inner().unwrap();
        assert_eq!(secrets.gemini_api_key, "gm-test");

        unsafe { env::remove_var(GEMINI_API_KEY_ENV) }
    }

    #[test]
    fn test_missing_key_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::remove_var(GEMINI_API_KEY_ENV) }

        let result = Secrets::from_env_inner();
        assert!(matches!(result, Err(SecretsError::MissingSecret(name)) if name == "GEMINI_API_KEY"));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var(GEMINI_API_KEY_ENV, "   ") }

        assert!(Secrets::from_env_inner().is_err());

        unsafe { env::remove_var(GEMINI_API_KEY_ENV) }
    }

    #[test]
    fn test_debug_redacts_key() {
        let secrets = Secrets {
            gemini_api_key: "gm-very-secret".to_string(),
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("gm-very-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
