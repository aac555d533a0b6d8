//! Per-provider rate limiting
//!
//! Token buckets for requests-per-minute and tokens-per-minute, plus an
//! AIMD-style adaptive concurrency ceiling that self-tunes to observed
//! provider capacity.

mod limiter;
mod types;


pub use limiter::ProviderRateLimiter;
pub use types::LimiterSnapshot;
