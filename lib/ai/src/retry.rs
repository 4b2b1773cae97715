//! Retry with exponential backoff for transient LLM failures.

use crate::error::LlmError;
use rootcause::Report;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay, including `retry-after` hints.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`.
    pub async fn run<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, Report<LlmError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Report<LlmError>>>,
    {
        let mut attempt = 0;
        let mut delay = self.initial_backoff;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(report)
                    if report.current_context().is_retryable() && attempt < self.max_retries =>
                {
                    attempt += 1;
                    let wait = match report.current_context() {
                        LlmError::RateLimited {
                            retry_after_secs: Some(secs),
                        } => Duration::from_secs(*secs),
                        _ => delay,
                    }
                    .min(self.max_backoff);

                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_retries + 1,
                        wait_ms = wait.as_millis() as u64,
                        error = %report.current_context(),
                        "retrying after transient failure"
                    );

                    tokio::time::sleep(wait).await;
                    delay = delay.saturating_mul(2);
                }
                Err(report) => return Err(report),
            }
        }
    }
}
