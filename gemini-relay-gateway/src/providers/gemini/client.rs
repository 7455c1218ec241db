//! Google Gemini API client.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::providers::upstream::{TransportError, Upstream, UpstreamResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client
///
/// Holds no per-request state; one instance is shared by all requests.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `generateContent` endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait::async_trait]
impl Upstream for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, payload: &Value) -> Result<UpstreamResponse, TransportError> {
        // The key travels in a header so it never shows up in error strings
        // that embed the request URL.
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status().as_u16();
        let response_text = response.text().await.map_err(request_failed)?;

        let body = serde_json::from_str::<Value>(&response_text)
            .unwrap_or(Value::String(response_text));

        Ok(UpstreamResponse { status, body })
    }
}

fn request_failed(error: reqwest::Error) -> TransportError {
    TransportError::RequestFailed(error.without_url().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new("gm-test", "gemini-2.5-flash").unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!client.endpoint().contains("gm-test"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GeminiClient::new("gm-test", "m")
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://127.0.0.1:9999/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn test_provider_metadata() {
        let client = GeminiClient::new("gm-test", "gemini-2.5-flash").unwrap();
        assert_eq!(client.name(), "gemini");
        assert_eq!(client.model(), "gemini-2.5-flash");
    }
}
