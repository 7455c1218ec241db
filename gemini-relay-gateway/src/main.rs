use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemini_relay_gateway::dispatch::Dispatcher;
use gemini_relay_gateway::providers::gemini::GeminiClient;
use gemini_relay_gateway::server;
use gemini_relay_gateway::state::{AppState, LogEntry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a missing API key stops startup here
    let config = gemini_relay_core::Config::load().inspect_err(|e| {
        error!("Failed to load configuration: {}", e);
    })?;
    let retry = config.retry_config();
    info!(
        "Configuration loaded (model: {}, max attempts: {}, backoff base: {:?}, timeout: {:?})",
        config.model(),
        retry.max_attempts,
        retry.backoff_base,
        retry.request_timeout
    );

    let client = GeminiClient::new(config.gemini_api_key(), config.model())?
        .with_base_url(&config.settings.upstream.base_url);
    info!("Gemini client created for endpoint {}", client.endpoint());

    let dispatcher = Dispatcher::new(Arc::new(client), retry);
    let state = Arc::new(AppState::new(dispatcher));
    state.log(LogEntry::Info {
        message: "gemini-relay starting".to_string(),
    });

    info!("Starting gemini-relay on {}", config.bind_addr());

    // Run server (this blocks)
    server::run(state, &config.settings.gateway).await
}
