//! Shared helpers for integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tower::ServiceExt;

use gemini_relay_core::RetryConfig;
use gemini_relay_gateway::dispatch::Dispatcher;
use gemini_relay_gateway::providers::{TransportError, Upstream, UpstreamResponse};
use gemini_relay_gateway::server::create_router;
use gemini_relay_gateway::state::AppState;

pub const BODY_LIMIT: usize = 64 * 1024;

/// Canned upstream behavior for one call.
#[allow(dead_code)]
pub enum Canned {
    Reply(&'static str),
    Status(u16),
    Empty,
    NetworkError,
}

/// Upstream that replays canned answers and remembers every payload.
pub struct CannedUpstream {
    answers: Mutex<VecDeque<Canned>>,
    calls: AtomicU32,
    payloads: Mutex<Vec<Value>>,
}

impl CannedUpstream {
    pub fn new(answers: Vec<Canned>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicU32::new(0),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn last_payload(&self) -> Option<Value> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Upstream for CannedUpstream {
    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }

    async fn generate_content(&self, payload: &Value) -> Result<UpstreamResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());

        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Canned::Status(500));
        match answer {
            Canned::Reply(text) => Ok(UpstreamResponse {
                status: 200,
                body: json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]}),
            }),
            Canned::Status(status) => Ok(UpstreamResponse {
                status,
                body: json!({"error": {"code": status, "message": "internal upstream detail"}}),
            }),
            Canned::Empty => Ok(UpstreamResponse {
                status: 200,
                body: json!({}),
            }),
            Canned::NetworkError => Err(TransportError::RequestFailed(
                "connection reset by peer".to_string(),
            )),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub upstream: Arc<CannedUpstream>,
    #[allow(dead_code)]
    pub state: Arc<AppState>,
}

pub fn test_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff_base: Duration::from_millis(300),
        request_timeout: Duration::from_secs(20),
        retry_empty_reply: true,
    }
}

pub fn build_app(answers: Vec<Canned>) -> TestApp {
    let upstream = CannedUpstream::new(answers);
    let dispatcher = Dispatcher::new(upstream.clone(), test_retry());
    let state = Arc::new(AppState::new(dispatcher));
    TestApp {
        router: create_router(state.clone(), BODY_LIMIT),
        upstream,
        state,
    }
}

/// POST a JSON body and return status plus parsed JSON response.
pub async fn post_json(router: &Router, path: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(router, path, body.to_string()).await
}

pub async fn post_raw(router: &Router, path: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub fn user_history(text: &str) -> Value {
    json!([{"role": "user", "parts": [{"text": text}]}])
}
