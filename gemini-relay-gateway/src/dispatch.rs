//! Resilient dispatch of generation requests.
//!
//! A request moves through `Attempting(1..=max_attempts)` and ends either
//! `Succeeded` with reply text or exhausted. Every failed attempt (transport
//! error, timeout, non-2xx status, empty reply) is retried after
//! `backoff_base * 2^(n-1)`; the last one is not followed by a delay.

use std::sync::Arc;
use std::time::Duration;

use gemini_relay_core::RetryConfig;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::chat::extract::{first_text, reply_or_fallback, upstream_error_message};
use crate::chat::request::GenerateRequest;
use crate::providers::upstream::{TransportError, Upstream, UpstreamResponse};

/// Message returned to callers once every attempt has failed.
pub const OVERLOADED_MESSAGE: &str =
    "The AI service is overloaded at the moment. Please try again later.";

/// Why a single attempt failed. All variants are retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Network failure or timeout
    Transport(TransportError),
    /// Upstream answered outside the 2xx range
    Status {
        status: u16,
        message: Option<String>,
    },
    /// 2xx answer without reply text
    EmptyReply,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Transport(err) => write!(f, "{}", err),
            AttemptFailure::Status {
                status,
                message: Some(message),
            } => write!(f, "upstream status {}: {}", status, message),
            AttemptFailure::Status {
                status,
                message: None,
            } => write!(f, "upstream status {}", status),
            AttemptFailure::EmptyReply => write!(f, "upstream returned no reply text"),
        }
    }
}

/// Result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success(String),
    Failure { reason: AttemptFailure, attempt: u32 },
}

/// Errors surfaced by [`Dispatcher::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The payload could not be serialized; no attempt was made.
    #[error("Malformed request payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Every attempt failed. Per-attempt detail is only logged.
    #[error("{}", OVERLOADED_MESSAGE)]
    Exhausted { attempts: u32 },
}

/// Observability hook for the retry loop.
pub trait DispatchSink: Send + Sync {
    /// Called once per attempt. `backoff` is the delay about to be taken
    /// before the next attempt, `None` when no retry follows.
    fn record_attempt(
        &self,
        attempt: u32,
        max_attempts: u32,
        outcome: &DispatchOutcome,
        backoff: Option<Duration>,
    );

    /// Called once when the last attempt has failed.
    fn record_exhausted(&self, attempts: u32, last_failure: &AttemptFailure);
}

/// Sink that only emits tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DispatchSink for TracingSink {
    fn record_attempt(
        &self,
        attempt: u32,
        max_attempts: u32,
        outcome: &DispatchOutcome,
        backoff: Option<Duration>,
    ) {
        match (outcome, backoff) {
            (DispatchOutcome::Success(reply), _) => info!(
                attempt,
                max_attempts,
                reply_chars = reply.chars().count() as u64,
                "Upstream attempt succeeded"
            ),
            (DispatchOutcome::Failure { reason, .. }, Some(delay)) => warn!(
                attempt,
                max_attempts,
                backoff_ms = delay.as_millis() as u64,
                "Upstream attempt failed, retrying: {}",
                reason
            ),
            (DispatchOutcome::Failure { reason, .. }, None) => warn!(
                attempt,
                max_attempts,
                "Upstream attempt failed: {}",
                reason
            ),
        }
    }

    fn record_exhausted(&self, attempts: u32, last_failure: &AttemptFailure) {
        error!(
            attempts,
            "Upstream retries exhausted, last failure: {}", last_failure
        );
    }
}

/// Sends generation requests upstream with bounded retries.
///
/// Holds no mutable state; one instance serves all requests concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    upstream: Arc<dyn Upstream>,
    retry: RetryConfig,
}

impl Dispatcher {
    pub fn new(upstream: Arc<dyn Upstream>, retry: RetryConfig) -> Self {
        Self { upstream, retry }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// One upstream call bounded by the request timeout, without retry.
    pub async fn send_once(&self, payload: &Value) -> Result<UpstreamResponse, TransportError> {
        let timeout = self.retry.request_timeout;
        match tokio::time::timeout(timeout, self.upstream.generate_content(payload)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    /// Send `request` until a reply is obtained or attempts run out.
    pub async fn dispatch(
        &self,
        request: &GenerateRequest,
        sink: &dyn DispatchSink,
    ) -> Result<String, DispatchError> {
        let payload = serde_json::to_value(request)?;
        let max_attempts = self.retry.max_attempts.max(1);

        debug!(
            provider = self.upstream.name(),
            model = self.upstream.model(),
            turns = request.contents.len() as u64,
            "Dispatching generation request"
        );

        let mut attempt = 1;
        loop {
            let outcome = match self.send_once(&payload).await {
                Ok(response) => self.classify(response, attempt),
                Err(err) => DispatchOutcome::Failure {
                    reason: AttemptFailure::Transport(err),
                    attempt,
                },
            };

            let reason = match outcome {
                DispatchOutcome::Success(ref reply) => {
                    sink.record_attempt(attempt, max_attempts, &outcome, None);
                    return Ok(reply.clone());
                }
                DispatchOutcome::Failure { ref reason, .. } => reason.clone(),
            };

            if attempt >= max_attempts {
                sink.record_attempt(attempt, max_attempts, &outcome, None);
                sink.record_exhausted(attempt, &reason);
                return Err(DispatchError::Exhausted { attempts: attempt });
            }

            let delay = self.retry.backoff_delay(attempt);
            sink.record_attempt(attempt, max_attempts, &outcome, Some(delay));
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn classify(&self, response: UpstreamResponse, attempt: u32) -> DispatchOutcome {
        if !response.is_success() {
            return DispatchOutcome::Failure {
                reason: AttemptFailure::Status {
                    status: response.status,
                    message: upstream_error_message(&response.body),
                },
                attempt,
            };
        }

        if !self.retry.retry_empty_reply {
            return DispatchOutcome::Success(reply_or_fallback(&response.body));
        }

        match first_text(&response.body) {
            Some(reply) => DispatchOutcome::Success(reply),
            None => DispatchOutcome::Failure {
                reason: AttemptFailure::EmptyReply,
                attempt,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted upstream and recording sink shared by unit tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use super::*;

    /// What the scripted upstream does on one call.
    pub enum Step {
        Reply(&'static str),
        Status(u16),
        Body(u16, Value),
        Fail,
        Hang,
    }

    pub struct ScriptedUpstream {
        steps: Mutex<VecDeque<Step>>,
        pub calls: AtomicU32,
        pub payloads: Mutex<Vec<Value>>,
    }

    impl ScriptedUpstream {
        pub fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicU32::new(0),
                payloads: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn reply_body(text: &str) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    }

    #[async_trait::async_trait]
    impl Upstream for ScriptedUpstream {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn generate_content(
            &self,
            payload: &Value,
        ) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payloads.lock().unwrap().push(payload.clone());
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Step::Status(500));
            match step {
                Step::Reply(text) => Ok(UpstreamResponse {
                    status: 200,
                    body: reply_body(text),
                }),
                Step::Status(status) => Ok(UpstreamResponse {
                    status,
                    body: json!({"error": {"code": status, "message": "scripted failure"}}),
                }),
                Step::Body(status, body) => Ok(UpstreamResponse { status, body }),
                Step::Fail => Err(TransportError::RequestFailed(
                    "connection refused".to_string(),
                )),
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(TransportError::RequestFailed("unreachable".to_string()))
                }
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Attempt {
            attempt: u32,
            success: bool,
            backoff: Option<Duration>,
        },
        Exhausted {
            attempts: u32,
        },
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<Recorded>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<Recorded> {
            self.events.lock().unwrap().clone()
        }

        pub fn total_backoff(&self) -> Duration {
            self.events()
                .iter()
                .filter_map(|event| match event {
                    Recorded::Attempt { backoff, .. } => *backoff,
                    Recorded::Exhausted { .. } => None,
                })
                .sum()
        }
    }

    impl DispatchSink for RecordingSink {
        fn record_attempt(
            &self,
            attempt: u32,
            _max_attempts: u32,
            outcome: &DispatchOutcome,
            backoff: Option<Duration>,
        ) {
            self.events.lock().unwrap().push(Recorded::Attempt {
                attempt,
                success: matches!(outcome, DispatchOutcome::Success(_)),
                backoff,
            });
        }

        fn record_exhausted(&self, attempts: u32, _last_failure: &AttemptFailure) {
            self.events
                .lock()
                .unwrap()
                .push(Recorded::Exhausted { attempts });
        }
    }
}
