//! Request, response, and provider health models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One logical completion request
///
/// Immutable once constructed; only the security filter rewrites its text
/// fields before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// User prompt text
    pub prompt: String,
    /// Optional system instruction
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Precomputed embedding of the prompt, used for semantic cache keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output length in tokens
    pub max_tokens: u32,
    /// Restrict routing to providers serving this model or provider name
    #[serde(default)]
    pub model_preference: Option<String>,
    /// Identifier of the calling user or subsystem
    #[serde(default)]
    pub user_id: Option<String>,
    /// Unique identifier carried through retries of this logical call
    pub trace_id: String,
    /// Arbitrary caller metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl LlmRequest {
    /// Create a request with default sampling parameters and a fresh trace id
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            embedding: None,
            temperature: 0.7,
            max_tokens: 1_000,
            model_preference: None,
            user_id: None,
            trace_id: Uuid::new_v4().simple().to_string(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Attach a precomputed embedding vector
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Restrict routing to a provider or model
    pub fn with_preference(mut self, preference: impl Into<String>) -> Self {
        self.model_preference = Some(preference.into());
        self
    }

    /// Override sampling parameters
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Rough token cost of this request, used for limiter accounting
    pub fn estimated_tokens(&self) -> u32 {
        let words = self.prompt.split_whitespace().count()
            + self
                .system_prompt
                .as_deref()
                .map(|s| s.split_whitespace().count())
                .unwrap_or(0);
        (words as f64 * 1.3).ceil().max(1.0) as u32
    }
}

/// Token accounting reported by a provider, zeroed when unreported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Total tokens for the call
    pub total_tokens: u32,
}

/// Completion response with routing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Name of the provider that served the call
    pub provider: String,
    /// Model identifier that produced the text
    pub model: String,
    /// End-to-end latency in milliseconds
    pub latency_ms: f64,
    /// Time to first token in milliseconds, when measured
    #[serde(default)]
    pub ttft_ms: Option<f64>,
    /// Token accounting for the call
    #[serde(default)]
    pub token_usage: TokenUsage,
    /// Estimated monetary cost in USD
    #[serde(default)]
    pub cost_usd: f64,
    /// Whether the response was served from the semantic cache
    #[serde(default)]
    pub cached: bool,
    /// Trace id of the originating request
    #[serde(default)]
    pub trace_id: String,
}

/// Normalized rate-limit information parsed from provider response headers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimitInfo {
    /// Remaining requests in the provider's current window
    pub remaining_requests: Option<u32>,
    /// Remaining tokens in the provider's current window
    pub remaining_tokens: Option<u32>,
    /// When the provider's window resets
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    /// Fold another observation in, keeping prior values where absent
    pub fn merge(&mut self, other: &RateLimitInfo) {
        if other.remaining_requests.is_some() {
            self.remaining_requests = other.remaining_requests;
        }
        if other.remaining_tokens.is_some() {
            self.remaining_tokens = other.remaining_tokens;
        }
        if other.reset_at.is_some() {
            self.reset_at = other.reset_at;
        }
    }
}

/// Real-time provider health and usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Whether the provider is currently considered usable
    pub healthy: bool,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// When the provider last failed
    pub last_failure: Option<DateTime<Utc>>,
    /// Deadline until which the provider's breaker stays open
    pub circuit_open_until: Option<DateTime<Utc>>,
    /// Remaining request quota reported by the provider
    pub rpm_remaining: Option<u32>,
    /// Remaining token quota reported by the provider
    pub tpm_remaining: Option<u32>,
    /// When the provider's quota window resets
    pub rate_limit_reset: Option<DateTime<Utc>>,
    /// In-flight calls right now
    pub current_concurrency: u32,
    /// Ceiling on in-flight calls
    pub max_concurrency: u32,
    /// Calls routed to this provider since startup
    pub total_requests: u64,
    /// Calls that ended in failure
    pub total_errors: u64,
    /// Exponential moving average of call latency
    pub avg_latency_ms: f64,
}

impl ProviderHealth {
    /// Fresh health record with the given concurrency ceiling
    pub fn new(max_concurrency: u32) -> Self {
        Self {
            healthy: true,
            consecutive_failures: 0,
            last_failure: None,
            circuit_open_until: None,
            rpm_remaining: None,
            tpm_remaining: None,
            rate_limit_reset: None,
            current_concurrency: 0,
            max_concurrency,
            total_requests: 0,
            total_errors: 0,
            avg_latency_ms: 0.0,
        }
    }

    /// Record a successful call and fold its latency into the moving average
    pub fn record_success(&mut self, latency_ms: f64) {
        self.total_requests += 1;
        self.consecutive_failures = 0;
        self.healthy = true;
        self.circuit_open_until = None;
        self.avg_latency_ms = if self.total_requests == 1 {
            latency_ms
        } else {
            self.avg_latency_ms * 0.9 + latency_ms * 0.1
        };
    }

    /// Record a failed call
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.total_errors += 1;
        self.consecutive_failures += 1;
        self.last_failure = Some(Utc::now());
    }

    /// Fold fresh quota headers into the record
    pub fn update_quota(&mut self, info: &RateLimitInfo) {
        if let Some(remaining) = info.remaining_requests {
            self.rpm_remaining = Some(remaining);
        }
        if let Some(remaining) = info.remaining_tokens {
            self.tpm_remaining = Some(remaining);
        }
        if let Some(reset) = info.reset_at {
            self.rate_limit_reset = Some(reset);
        }
    }
}
