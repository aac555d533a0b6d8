//! Rate limiter types and data structures

use std::time::Instant;

/// Diagnostic snapshot of one provider's limiter
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterSnapshot {
    /// Request tokens currently available
    pub request_tokens: f64,
    /// Completion-token budget currently available
    pub token_tokens: f64,
    /// Current adaptive concurrency ceiling
    pub current_concurrency: u32,
    /// Acquisitions granted since startup
    pub granted: u64,
    /// Acquisitions refused since startup
    pub refused: u64,
}

/// Mutable bucket state, guarded by the limiter's mutex
#[derive(Debug)]
pub(super) struct BucketState {
    /// Available request tokens
    pub(super) request_tokens: f64,
    /// Available completion-token budget
    pub(super) token_tokens: f64,
    /// Last continuous-refill timestamp
    pub(super) last_refill: Instant,
    /// Current adaptive in-flight ceiling
    pub(super) current_concurrency: u32,
    /// Consecutive successful acquisitions
    pub(super) consecutive_grants: u32,
    /// Consecutive refusals
    pub(super) consecutive_refusals: u32,
    /// Total grants
    pub(super) granted: u64,
    /// Total refusals
    pub(super) refused: u64,
}
