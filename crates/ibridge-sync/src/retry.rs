//! Bounded exponential backoff
//!
//! Every call to [`RetryPolicy::run`] is its own retry domain: nothing is
//! shared between files or operations.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use ibridge_core::config::RetryConfig;

/// Retry settings for one fallible operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
        }
    }
}

impl RetryPolicy {
    /// Delay to use after `current`: `current * backoff_factor`, capped at
    /// `max_delay`. A zero, negative or non-finite factor yields zero.
    pub fn next_delay(&self, current: Duration) -> Duration {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let scaled = current.as_secs_f64() * self.backoff_factor;
        Duration::try_from_secs_f64(scaled)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds or `max_attempts` is reached.
    ///
    /// Sleeps `initial_delay` after the first failure and grows the delay by
    /// [`RetryPolicy::next_delay`] after each further one. A `max_attempts`
    /// of zero still performs one attempt.
    ///
    /// On exhaustion the last error is returned with
    /// `"<label> failed after <n> attempts"` as outer context.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts => {
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    delay = self.next_delay(delay);
                }
                Err(err) => {
                    return Err(err.context(format!("{label} failed after {attempt} attempts")));
                }
            }
        }
    }
}
