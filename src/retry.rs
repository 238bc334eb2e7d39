//! Bounded retry with backoff for rate-limited and failing calls.
//!
//! Only [`ApiError::RateLimit`] and [`ApiError::Server`] are retried. Rate
//! limits honour the server's `retry_after` when known; otherwise both use
//! exponential backoff with jitter. Server waits are capped.
//!
//! All state lives on the stack of one [`with_retry`] call, so dropping the
//! returned future (e.g. under `tokio::time::timeout`) cancels any in-flight
//! attempt or wait cleanly.

use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Unit of the exponential backoff: the wait before retry `n + 1` is
/// `base * (2^n + U(0, 1))`.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any wait caused by a server error.
pub const MAX_SERVER_DELAY: Duration = Duration::from_secs(30);

/// Observer invoked before each retry with the 1-based retry number and the
/// error that triggered it.
pub type RetryObserver = dyn Fn(u32, &ApiError) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_server_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
            max_server_delay: MAX_SERVER_DELAY,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait before re-issuing a call that failed on attempt `attempt`
    /// (0-based). `None` means the error must not be retried at all.
    pub fn delay_for(&self, attempt: u32, error: &ApiError) -> Option<Duration> {
        match error {
            ApiError::RateLimit(rate_limit) => Some(
                rate_limit
                    .retry_after
                    .unwrap_or_else(|| self.backoff(attempt)),
            ),
            ApiError::Server { .. } => Some(self.backoff(attempt).min(self.max_server_delay)),
            _ => None,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = 2f64.powi(attempt.min(1023) as i32);
        let jitter = rand::random::<f64>();
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * (exponent + jitter))
            .unwrap_or(Duration::MAX)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent.
///
/// On exhaustion the error from the final attempt is returned unchanged.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    on_retry: Option<&RetryObserver>,
    operation: F,
) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt: u32 = 0;

    loop {
        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let Some(wait) = policy.delay_for(attempt, &error) else {
            debug!(
                "{}: non-retryable {} error: {}",
                operation_name,
                error.kind(),
                error
            );
            return Err(error);
        };

        if attempt >= policy.max_retries {
            warn!(
                "{}: max retries ({}) exceeded, last {} error: {}",
                operation_name,
                policy.max_retries,
                error.kind(),
                error
            );
            return Err(error);
        }

        attempt += 1;
        info!(
            "{}: {} error ({}), retry {}/{} in {:.2}s",
            operation_name,
            error.kind(),
            error,
            attempt,
            policy.max_retries,
            wait.as_secs_f64()
        );

        if let Some(observer) = on_retry {
            observer(attempt, &error);
        }

        tokio::time::sleep(wait).await;
    }
}
