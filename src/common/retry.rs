//! Exponential backoff around fallible network operations.
//!
//! Every failure is eligible for retry: the HTTP stack is opaque enough that
//! transient and permanent failures cannot usefully be told apart here.
//! Fast-terminal outcomes (412 conflicts, 401/403) are mapped from response
//! statuses a layer above and never reach this engine.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::warn;

/// Backoff policy for [`with_retries`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one. Clamped to at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Scale each delay by a uniform factor in `[0.5, 1.0]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay to sleep after the k-th failed attempt (1-indexed), before jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds or the attempt budget is exhausted.
///
/// The last error is surfaced on exhaustion. Each retry is logged at warn
/// level with the operation name, attempt number, delay, and error summary.
pub async fn with_retries<T, F, Fut>(config: &RetryConfig, op: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < attempts {
                    let mut delay = config.delay_for_attempt(attempt);
                    if config.jitter {
                        let factor: f64 = rand::rng().random_range(0.5..=1.0);
                        delay = delay.mul_f64(factor);
                    }
                    warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %format!("{err:#}"),
                        "operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.expect("at least one attempt was made"))
}
