//! Per-provider circuit breaker
//!
//! Tracks consecutive failures and stops calls to a provider that keeps
//! failing until a cool-down elapses. One breaker per provider; all state
//! lives under a single mutex.

use crate::config::CircuitBreakerConfig;
use crate::utils::error::{Result, RouterError};
use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected without touching the network
    Open,
    /// One trial request is allowed through
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Failure tracker guarding one provider
pub struct CircuitBreaker {
    provider: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a breaker from shared thresholds
    pub fn new(provider: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self::with_settings(
            provider,
            config.failure_threshold,
            config.recovery_timeout(),
        )
    }

    /// Create a breaker with explicit thresholds
    pub fn with_settings(
        provider: impl Into<String>,
        failure_threshold: u32,
        recovery_timeout: Duration,
    ) -> Self {
        Self {
            provider: provider.into(),
            failure_threshold,
            recovery_timeout,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Execute a call under breaker protection
    ///
    /// While open and before the recovery deadline this fails immediately
    /// with `CircuitOpen`, without running the closure. Errors from the
    /// closure pass through unchanged.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.try_permit()?;

        match f().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                self.on_failure();
                Err(error)
            }
        }
    }

    /// Whether a call would currently be admitted, without mutating state
    pub fn is_call_permitted(&self) -> bool {
        let state = self.state.lock();
        match state.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !state.trial_in_flight,
            CircuitState::Open => state
                .opened_at
                .is_some_and(|opened| opened.elapsed() >= self.recovery_timeout),
        }
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Failures since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// Remaining cool-down, when the breaker is open
    pub fn open_remaining(&self) -> Option<Duration> {
        let state = self.state.lock();
        match state.state {
            CircuitState::Open => state
                .opened_at
                .map(|opened| self.recovery_timeout.saturating_sub(opened.elapsed())),
            _ => None,
        }
    }

    /// Admit the call or fail fast, transitioning open breakers whose
    /// cool-down has elapsed into half-open
    fn try_permit(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let expired = state
                    .opened_at
                    .is_some_and(|opened| opened.elapsed() >= self.recovery_timeout);
                if expired {
                    info!(provider = %self.provider, "Circuit breaker half-open, allowing trial call");
                    state.state = CircuitState::HalfOpen;
                    state.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(RouterError::CircuitOpen {
                        provider: self.provider.clone(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if state.trial_in_flight {
                    Err(RouterError::CircuitOpen {
                        provider: self.provider.clone(),
                    })
                } else {
                    state.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn on_success(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = 0;
        state.trial_in_flight = false;
        if state.state != CircuitState::Closed {
            info!(provider = %self.provider, "Circuit breaker closed after successful trial");
            state.state = CircuitState::Closed;
            state.opened_at = None;
        }
    }

    fn on_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures += 1;
        let was_trial = state.trial_in_flight;
        state.trial_in_flight = false;

        if state.state == CircuitState::HalfOpen && was_trial {
            warn!(provider = %self.provider, "Trial call failed, circuit breaker reopened");
            state.state = CircuitState::Open;
            state.opened_at = Some(Instant::now());
        } else if state.state == CircuitState::Closed
            && state.consecutive_failures >= self.failure_threshold
        {
            warn!(
                provider = %self.provider,
                failures = state.consecutive_failures,
                "Circuit breaker opened"
            );
            state.state = CircuitState::Open;
            state.opened_at = Some(Instant::now());
        } else {
            debug!(
                provider = %self.provider,
                failures = state.consecutive_failures,
                "Circuit breaker recorded failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn breaker(threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::with_settings("test", threshold, recovery)
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<()> {
        breaker
            .call(|| async {
                Err::<(), _>(RouterError::Provider {
                    provider: "test".to_string(),
                    status: Some(500),
                    message: "boom".to_string(),
                })
            })
            .await
    }

    #[tokio::test]
    async fn test_opens_after_threshold_failures() {
        let breaker = breaker(3, Duration::from_secs(60));

        for _ in 0..2 {
            assert!(fail(&breaker).await.is_err());
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        assert!(fail(&breaker).await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.is_call_permitted());
    }

    #[tokio::test]
    async fn test_open_rejects_without_running_closure() {
        let breaker = breaker(1, Duration::from_secs(60));
        assert!(fail(&breaker).await.is_err());

        let calls = AtomicU32::new(0);
        let result = breaker
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(RouterError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_half_open_success_closes() {
        let breaker = breaker(1, Duration::from_millis(20));
        assert!(fail(&breaker).await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(breaker.is_call_permitted());

        let result = breaker.call(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let breaker = breaker(1, Duration::from_millis(20));
        assert!(fail(&breaker).await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(fail(&breaker).await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.open_remaining().is_some());
    }

    #[tokio::test]
    async fn test_half_open_admits_single_trial() {
        let breaker = Arc::new(breaker(1, Duration::from_millis(10)));
        assert!(fail(&breaker).await.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .call(|| async {
                        release_rx.await.ok();
                        Ok(1)
                    })
                    .await
            })
        };

        // Give the trial a moment to take the half-open slot
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let second = breaker.call(|| async { Ok(2) }).await;
        assert!(matches!(second, Err(RouterError::CircuitOpen { .. })));

        release_tx.send(()).unwrap();
        assert_eq!(trial.await.unwrap().unwrap(), 1);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
