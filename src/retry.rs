//! Explicit retry policy wrapped around provider call sites.

use std::future::Future;
use std::time::Duration;

/// Fixed-delay retry budget for calls to external providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    /// Five attempts with a two second pause between them.
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    /// Build a policy allowing `max_attempts` calls (at least one) separated by `delay`.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Total number of attempts, including the first call.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait applied between two attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds, returns a non-retryable error, or the budget runs out.
    ///
    /// The operation receives the 1-based attempt number. `is_retryable` decides whether an
    /// error is worth another attempt. The last error is returned on failure. Sleeping between
    /// attempts only suspends this future.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        operation_name: &str,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !is_retryable(&error) {
                        tracing::warn!(
                            operation = operation_name,
                            attempt,
                            error = %error,
                            "Provider call failed with a non-retryable error"
                        );
                        return Err(error);
                    }
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            operation = operation_name,
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %error,
                            "Provider call exhausted its retry budget"
                        );
                        return Err(error);
                    }
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Provider call failed; retrying"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
