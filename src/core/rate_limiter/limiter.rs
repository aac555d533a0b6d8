//! Core rate limiter implementation

use super::types::{BucketState, LimiterSnapshot};
use crate::config::RateLimitConfig;
use crate::core::models::RateLimitInfo;
use parking_lot::Mutex;
use std::time::Instant;
use tracing::debug;

// AIMD tuning: grants in a row before the ceiling grows, refusals in a row
// before it halves.
const AIMD_INCREASE_AFTER: u32 = 5;
const AIMD_DECREASE_AFTER: u32 = 2;

/// Token-bucket rate limiter with adaptive concurrency, one per provider
///
/// Two independent buckets (requests per minute, tokens per minute) refill
/// continuously from elapsed time and are capped at their configured
/// capacity. All state lives under a single mutex; `acquire` is the only
/// operation that both checks and consumes, so there is no
/// check-then-record race.
pub struct ProviderRateLimiter {
    rpm: u32,
    tpm: u32,
    max_concurrency: u32,
    state: Mutex<BucketState>,
}

impl ProviderRateLimiter {
    /// Create a limiter from the shared rate-limit defaults
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(config.default_rpm, config.default_tpm, config.max_concurrency)
    }

    /// Create a limiter with explicit limits
    pub fn with_limits(rpm: u32, tpm: u32, max_concurrency: u32) -> Self {
        Self {
            rpm,
            tpm,
            max_concurrency,
            state: Mutex::new(BucketState {
                request_tokens: rpm as f64,
                token_tokens: tpm as f64,
                last_refill: Instant::now(),
                current_concurrency: 1,
                consecutive_grants: 0,
                consecutive_refusals: 0,
                granted: 0,
                refused: 0,
            }),
        }
    }

    /// Atomically try to take one request slot and `estimated_tokens` budget
    ///
    /// On refusal nothing is consumed; only the AIMD bookkeeping moves.
    pub fn acquire(&self, estimated_tokens: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.request_tokens >= 1.0 && state.token_tokens >= estimated_tokens as f64 {
            state.request_tokens -= 1.0;
            state.token_tokens -= estimated_tokens as f64;
            state.granted += 1;
            state.consecutive_grants += 1;
            state.consecutive_refusals = 0;

            // Additive increase
            if state.consecutive_grants > AIMD_INCREASE_AFTER {
                state.current_concurrency =
                    (state.current_concurrency + 1).min(self.max_concurrency);
            }
            true
        } else {
            state.refused += 1;
            state.consecutive_grants = 0;
            state.consecutive_refusals += 1;

            // Multiplicative decrease
            if state.consecutive_refusals > AIMD_DECREASE_AFTER {
                state.current_concurrency = (state.current_concurrency / 2).max(1);
            }

            debug!(
                requests = state.request_tokens,
                tokens = state.token_tokens,
                "Rate limiter refused acquisition"
            );
            false
        }
    }

    /// Tighten bucket estimates from live provider quota headers
    ///
    /// Limits only ever shrink toward observed truth; a provider reporting
    /// more headroom than the local estimate is ignored.
    pub fn update_from_headers(&self, info: &RateLimitInfo) {
        let mut state = self.state.lock();
        if let Some(remaining) = info.remaining_requests {
            state.request_tokens = state.request_tokens.min(remaining as f64);
        }
        if let Some(remaining) = info.remaining_tokens {
            state.token_tokens = state.token_tokens.min(remaining as f64);
        }
    }

    /// Current adaptive in-flight ceiling
    pub fn current_concurrency(&self) -> u32 {
        self.state.lock().current_concurrency
    }

    /// Ceiling the adaptive concurrency may grow to
    pub fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }

    /// Diagnostic snapshot of the limiter state
    pub fn snapshot(&self) -> LimiterSnapshot {
        let mut state = self.state.lock();
        self.refill(&mut state);
        LimiterSnapshot {
            request_tokens: state.request_tokens,
            token_tokens: state.token_tokens,
            current_concurrency: state.current_concurrency,
            granted: state.granted,
            refused: state.refused,
        }
    }

    /// Continuous refill based on elapsed time, capped at capacity
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.request_tokens =
            (state.request_tokens + elapsed * (self.rpm as f64 / 60.0)).min(self.rpm as f64);
        state.token_tokens =
            (state.token_tokens + elapsed * (self.tpm as f64 / 60.0)).min(self.tpm as f64);
        state.last_refill = now;
    }
}
