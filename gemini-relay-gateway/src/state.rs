use std::time::Duration;

use tokio::sync::broadcast;

use crate::dispatch::{AttemptFailure, DispatchOutcome, DispatchSink, Dispatcher, TracingSink};

/// Log entry for broadcasting events to listeners
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// HTTP request handled
    HttpRequest {
        method: String,
        path: String,
        status: u16,
    },
    /// One upstream attempt finished
    UpstreamAttempt {
        attempt: u32,
        max_attempts: u32,
        success: bool,
        detail: String,
        backoff_ms: Option<u64>,
    },
    /// All upstream attempts failed
    UpstreamExhausted { attempts: u32, last_error: String },
    /// General info message
    Info { message: String },
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use chrono::Utc;
        let timestamp = Utc::now().format("%H:%M:%S");

        match self {
            LogEntry::HttpRequest {
                method,
                path,
                status,
            } => write!(f, "[{}] [HTTP] {} {} {}", timestamp, method, path, status),
            LogEntry::UpstreamAttempt {
                attempt,
                max_attempts,
                success,
                detail,
                backoff_ms,
            } => {
                let result = if *success { "ok" } else { "failed" };
                write!(
                    f,
                    "[{}] [UPSTREAM] attempt {}/{} {}: {}",
                    timestamp, attempt, max_attempts, result, detail
                )?;
                if let Some(ms) = backoff_ms {
                    write!(f, " (retrying in {}ms)", ms)?;
                }
                Ok(())
            }
            LogEntry::UpstreamExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "[{}] [UPSTREAM] exhausted after {} attempts: {}",
                timestamp, attempts, last_error
            ),
            LogEntry::Info { message } => {
                write!(f, "[{}] [INFO] {}", timestamp, message)
            }
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Retrying dispatcher in front of the upstream client
    pub dispatcher: Dispatcher,
    /// Log broadcast channel
    log_tx: broadcast::Sender<LogEntry>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (log_tx, _) = broadcast::channel(100);
        Self { dispatcher, log_tx }
    }

    /// Get a receiver for log entries
    pub fn subscribe_logs(&self) -> broadcast::Receiver<LogEntry> {
        self.log_tx.subscribe()
    }

    /// Broadcast a log entry. Dropped silently when nobody listens.
    pub fn log(&self, entry: LogEntry) {
        let _ = self.log_tx.send(entry);
    }
}

impl DispatchSink for AppState {
    fn record_attempt(
        &self,
        attempt: u32,
        max_attempts: u32,
        outcome: &DispatchOutcome,
        backoff: Option<Duration>,
    ) {
        TracingSink.record_attempt(attempt, max_attempts, outcome, backoff);

        let (success, detail) = match outcome {
            DispatchOutcome::Success(reply) => (true, format!("{} chars", reply.chars().count())),
            DispatchOutcome::Failure { reason, .. } => (false, reason.to_string()),
        };
        self.log(LogEntry::UpstreamAttempt {
            attempt,
            max_attempts,
            success,
            detail,
            backoff_ms: backoff.map(|delay| delay.as_millis() as u64),
        });
    }

    fn record_exhausted(&self, attempts: u32, last_failure: &AttemptFailure) {
        TracingSink.record_exhausted(attempts, last_failure);
        self.log(LogEntry::UpstreamExhausted {
            attempts,
            last_error: last_failure.to_string(),
        });
    }
}
