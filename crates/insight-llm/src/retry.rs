//! Quota-aware retry with deterministic exponential backoff.
//!
//! The policy is a bounded loop with an attempt counter, not recursion.
//! Each attempt index is handed to the caller's factory, which binds the
//! operation to credential `attempt mod N` — backoff and key rotation
//! advance together.
//!
//! Only quota-class errors are retried. Capability failures (provider
//! down, bad request, misconfiguration) propagate immediately; retrying
//! them would just add latency to an outcome that will not change.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{debug, warn};

use insight_types::RetryConfig;

/// Errors that can be classified as quota/rate-limit rejections.
pub trait QuotaClass {
    fn is_quota(&self) -> bool;
}

impl QuotaClass for crate::error::LlmError {
    fn is_quota(&self) -> bool {
        crate::error::LlmError::is_quota(self)
    }
}

/// Retry policy for quota-class failures.
///
/// Delays grow `base * 2^attempt` up to `max_delay` — deliberately
/// unjittered so the schedule is reproducible in tests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Run an operation, retrying quota-class failures.
    ///
    /// `factory(attempt)` must return the operation bound to the
    /// credential for that attempt (see
    /// [`crate::credentials::CredentialPool::key_for`]). On a quota-class
    /// error with retries remaining, the policy sleeps for the next
    /// backoff interval and invokes `factory(attempt + 1)`. Non-quota
    /// errors and exhausted retries return the error unchanged.
    pub async fn run<T, E, F, Fut>(&self, mut factory: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: QuotaClass + std::fmt::Display,
    {
        let mut delays = self.delays();
        let mut attempt: u32 = 0;

        loop {
            match factory(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "Operation succeeded after quota retries");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_quota() && attempt < self.max_retries => {
                    let delay = delays.next_backoff().unwrap_or(self.max_delay);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Quota hit; backing off and rotating credential"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn delays(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.base_delay,
            current_interval: self.base_delay,
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
