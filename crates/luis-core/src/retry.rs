//! Immediate retry on "too many requests" responses.

use std::future::Future;

use crate::error::Result;
use crate::http_client::HttpResponse;

const TRACING_TARGET: &str = "luis_core::retry";

/// Status code the remote uses to signal throttling.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Ceiling on physical attempts for a single logical call.
pub const MAX_RETRY: u32 = 300;

/// Retry policy shared by every call through one endpoint.
///
/// There is no delay between attempts; the concurrency gate already caps
/// how hard the endpoint can be hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total physical attempts, including the first one.
    pub max_attempts: u32,
    /// Status that triggers another attempt.
    pub retry_on_status: u16,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY,
            retry_on_status: TOO_MANY_REQUESTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Disable retries; every call is attempted exactly once.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Whether a response with `status` after `attempts` calls warrants another call.
    pub fn should_retry(&self, status: u16, attempts: u32) -> bool {
        status == self.retry_on_status && attempts < self.max_attempts
    }

    /// Runs `operation` until it answers with something other than the
    /// retry status or the attempt ceiling is reached, returning the last
    /// response either way. Errors from `operation` propagate immediately.
    pub async fn execute<F, Fut>(&self, mut operation: F) -> Result<HttpResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse>>,
    {
        let mut attempts = 0_u32;
        loop {
            let response = operation().await?;
            attempts += 1;

            if !self.should_retry(response.status, attempts) {
                if response.status == self.retry_on_status {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        attempts,
                        "Retry ceiling reached while throttled"
                    );
                }
                return Ok(response);
            }

            tracing::debug!(
                target: TRACING_TARGET,
                attempts,
                status = response.status,
                "Throttled by remote, retrying"
            );
        }
    }
}
