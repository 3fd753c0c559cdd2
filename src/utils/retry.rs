//! Bounded retry with exponential backoff for remote calendar calls.
//!
//! Only errors that report themselves as transient are retried. A server
//! supplied `Retry-After` hint replaces the computed delay, capped at the
//! configured maximum.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_transient(&self) -> bool;

    /// Delay requested by the server, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Retry tuning, loaded from the `[retry]` table of `config/sync.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Result of a retried operation with the number of attempts it took
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Attempts beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Run `operation` until it succeeds, fails permanently or attempts run out
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = config.effective_attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(error) if error.is_transient() && attempt < max_attempts => {
                let computed = config.delay_for(attempt);
                let delay = error
                    .retry_after()
                    .map(|hint| hint.min(Duration::from_millis(config.max_delay_ms)))
                    .unwrap_or(computed);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label, attempt, max_attempts, error, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                debug!("{} giving up after {} attempt(s): {}", label, attempt, error);
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                };
            }
        }
    }
}
