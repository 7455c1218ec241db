use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gemini_relay_core::GatewaySettings;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::chat::{ConversationHistory, ValidationError, build_generate_request, generate_title};
use crate::dispatch::DispatchError;
use crate::state::{AppState, LogEntry};

/// Body of `POST /api/generate`
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub history: Option<ConversationHistory>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Reply for `POST /api/generate`
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub reply: String,
}

/// Body of `POST /api/generate-title`
#[derive(Debug, Deserialize)]
pub struct TitleBody {
    #[serde(rename = "userMessage")]
    pub user_message: Option<String>,
}

/// Reply for `POST /api/generate-title`
#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponse {
    pub title: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures of the generate endpoint, mapped to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(DispatchError::MalformedPayload(_)) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(DispatchError::Exhausted { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(error_response)).into_response()
    }
}

/// Run the HTTP server
pub async fn run(
    state: Arc<AppState>,
    gateway: &GatewaySettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = format!("{}:{}", gateway.host, gateway.port);
    let app = create_router(state, gateway.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/generate-title", post(generate_title_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Generate handler - POST /api/generate
async fn generate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(body)) => generate_reply(&state, body).await,
        // Oversized bodies keep the 413 from the body limit layer.
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Rejected oversized generate request: {}", rejection);
            return rejection.into_response();
        }
        Err(rejection) => Err(ValidationError::MalformedBody(rejection.body_text()).into()),
    };

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    state.log(LogEntry::HttpRequest {
        method: "POST".to_string(),
        path: "/api/generate".to_string(),
        status: status.as_u16(),
    });

    match result {
        Ok(reply) => (StatusCode::OK, Json(GenerateResponse { reply })).into_response(),
        Err(e) => {
            match &e {
                ApiError::Validation(reason) => warn!("Rejected generate request: {}", reason),
                ApiError::Dispatch(reason) => error!("Generate request failed: {}", reason),
            }
            e.into_response()
        }
    }
}

async fn generate_reply(state: &AppState, body: GenerateBody) -> Result<String, ApiError> {
    let history = body.history.unwrap_or_default();
    let request = build_generate_request(history, body.image.as_deref())?;

    info!(turns = request.contents.len() as u64, "Received generate request");

    let reply = state.dispatcher.dispatch(&request, state).await?;
    Ok(reply)
}

/// Title handler - POST /api/generate-title
///
/// Always answers 200 with a title; malformed bodies get the fallback.
async fn generate_title_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TitleBody>, JsonRejection>,
) -> impl IntoResponse {
    let user_message = match body {
        Ok(Json(body)) => body.user_message,
        Err(rejection) => {
            warn!("Unreadable title request: {}", rejection);
            None
        }
    };

    let title = generate_title(&state.dispatcher, user_message.as_deref()).await;

    state.log(LogEntry::HttpRequest {
        method: "POST".to_string(),
        path: "/api/generate-title".to_string(),
        status: 200,
    });

    Json(TitleResponse { title })
}
