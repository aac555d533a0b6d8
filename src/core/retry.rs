//! Retry with exponential backoff and jitter
//!
//! Delays grow as `base * factor^attempt`, capped and perturbed by ±25%
//! jitter. A provider-supplied retry-after hint overrides the computed
//! delay. The final failure is always surfaced to the caller.

use crate::config::RetryConfig;
use crate::utils::error::{Result, RouterError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

const JITTER_FRACTION: f64 = 0.25;

/// Retrying executor shared across providers
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Create a policy from configuration
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
        }
    }

    /// Maximum attempts per logical call
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `f` until it succeeds, fails terminally, or attempts run out
    ///
    /// Non-retryable errors surface immediately; exhausting all attempts
    /// re-raises the last failure.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Retry succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if attempt >= self.max_attempts {
                        error!("Max retries reached after {} attempts: {}", attempt, err);
                        return Err(err);
                    }

                    let delay = self.delay_for(attempt, &err);
                    debug!(
                        "Attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, self.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Delay before the next attempt, honoring any provider hint
    fn delay_for(&self, attempt: u32, error: &RouterError) -> Duration {
        if let Some(hint) = error.retry_after() {
            return hint.min(self.max_delay);
        }

        let exponent = (attempt - 1) as i32;
        let backoff = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = backoff.min(self.max_delay.as_secs_f64());

        // ±25% jitter so synchronized callers spread out
        let jitter = capped * JITTER_FRACTION * (2.0 * rand::thread_rng().r#gen::<f64>() - 1.0);
        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}
