pub mod config;
pub mod retry;

pub use config::{
    Config, ConfigError, GatewaySettings, RetrySettings, Secrets, SecretsError, Settings,
    SettingsError, UpstreamSettings, load_dotenv,
};
pub use retry::RetryConfig;
