//! Bounded exponential backoff around single remote calls
//!
//! Every remote call site wraps its operation in [`with_retry`] (or
//! [`RetryPolicy::run`]). The policy decides how many attempts are made, how
//! long to wait between them, and which failures are worth another attempt.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CleanupError, Result};

/// Predicate deciding whether a failure should be retried
pub type RetryPredicate = fn(&CleanupError) -> bool;

/// Retry schedule: attempt budget, exponential delays, retryable classifier
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    /// Failures for which another attempt is made
    pub retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    /// 5 attempts, 1s doubling up to 20s, retrying 429/500/502/503/504 only
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
            multiplier: 2,
            retryable: CleanupError::is_transient,
        }
    }
}

impl RetryPolicy {
    /// Same budget and classifier as the default, but without sleeping
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Single attempt, never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, error: &CleanupError, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.retryable)(error)
    }

    /// Execute an async operation, retrying retryable failures
    ///
    /// The last error is returned unchanged once the budget is spent or a
    /// non-retryable failure occurs.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation_name, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if self.should_retry(&e, attempt) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name, attempt, self.max_attempts, e, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Wrap `operation` with `policy`; shorthand for [`RetryPolicy::run`]
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation_name: &str, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.run(operation_name, operation).await
}
