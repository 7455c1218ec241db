//! Retry policy shared between configuration and the dispatcher.

use std::time::Duration;

/// Immutable retry policy, built once from [`crate::Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure.
    pub backoff_base: Duration,
    /// Bound on each individual upstream call.
    pub request_timeout: Duration,
    /// Whether a 2xx answer without reply text counts as a failed attempt.
    pub retry_empty_reply: bool,
}

impl RetryConfig {
    /// Delay to wait after failed attempt `attempt` (1-based):
    /// `backoff_base * 2^(attempt - 1)`, without jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_base.saturating_mul(1_u32 << exponent)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(300),
            request_timeout: Duration::from_secs(20),
            retry_empty_reply: true,
        }
    }
}
