//! Consumer retry with exponential backoff
//!
//! Transient failures (store or broker unavailability) get a bounded number
//! of local attempts before the error escapes to the caller's dead-letter
//! or logging policy.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounds for a retried operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt
    pub initial_backoff: Duration,
    /// Cap on the exponential growth
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// One retry only — the policy for synchronous store reads, where the
    /// caller must propagate rather than retry indefinitely.
    pub fn single_retry() -> Self {
        Self {
            max_attempts: 2,
            ..Self::default()
        }
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// `context` names the operation in logs (e.g. `record_order_event`).
/// Returns the last error once `max_attempts` have failed.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    policy: &RetryPolicy,
    context: &str,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut backoff = policy.initial_backoff;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(context, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt == policy.max_attempts => {
                warn!(context, attempts = attempt, error = %e, "operation failed after max retries");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    context,
                    attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "operation failed, retrying with backoff"
                );
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, policy.max_backoff);
            }
        }
    }

    unreachable!("retry loop returns on the final attempt")
}
