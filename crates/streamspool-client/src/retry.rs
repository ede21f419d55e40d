//! Fixed-delay retry for publish attempts.
//!
//! Every flush retries failed publishes a bounded number of times with a
//! fixed delay between attempts:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  RetryPolicy                 │
//! │  - max_attempts: 10          │
//! │  - retry_delay: 1s           │
//! └──────┬───────────────────────┘
//!        │
//!        ├─→ Attempt 1: immediate
//!        ├─→ Attempt 2: after 1s
//!        ├─→ ...
//!        └─→ Attempt 10: after 1s, then give up
//! ```
//!
//! Fixed delay rather than exponential backoff is deliberate: with the
//! attempt ceiling and the per-attempt deadline it keeps the worst-case
//! flush latency at `max_attempts * (deadline + delay)`, a bound the
//! shutdown path depends on. The policy is parameterizable but any
//! configuration retains that bounded character.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded fixed-delay retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. At least 1.
    pub max_attempts: usize,

    /// Delay between consecutive attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }
}

/// Run `operation` until it succeeds or the policy's attempts run out.
///
/// The delay is applied between attempts, not after the final failure.
/// Returns the last error once attempts are exhausted.
pub async fn retry_fixed_delay<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Publish succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt >= policy.max_attempts {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "Attempts exhausted, giving up"
                    );
                    return Err(err);
                }
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = policy.retry_delay.as_millis() as u64,
                    error = %err,
                    "Publish attempt failed, retrying"
                );
                sleep(policy.retry_delay).await;
            }
        }
    }
}
