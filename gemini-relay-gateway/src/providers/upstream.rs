//! Transport seam between the dispatcher and a concrete upstream API.

use std::time::Duration;

use serde_json::Value;

/// Raw upstream answer: HTTP status plus the body as JSON.
///
/// Bodies that are not valid JSON are kept as a JSON string so they can
/// still be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to obtain any HTTP answer from the upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Upstream request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),
}

/// A generative-text endpoint accepting a `generateContent` payload.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send one request. Non-2xx statuses are returned, not turned into errors.
    async fn generate_content(&self, payload: &Value) -> Result<UpstreamResponse, TransportError>;
}
