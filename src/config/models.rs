//! Configuration model structures

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_weight() -> f64 {
    1.0
}

fn default_priority() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_pool_size() -> usize {
    10
}

fn default_rpm() -> u32 {
    60
}

fn default_tpm() -> u32 {
    100_000
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_factor() -> f64 {
    5.0
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_size() -> usize {
    1_000
}

fn default_epsilon() -> f32 {
    0.1
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_probe_interval_secs() -> u64 {
    60
}

/// Kind of backend a provider entry speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-style chat completions API
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Groq's OpenAI-compatible API
    Groq,
    /// Google Gemini generateContent API
    Gemini,
}

/// Configuration for one backend provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name used in routing, metrics, and errors
    pub name: String,
    /// Which adapter handles this provider
    pub kind: ProviderKind,
    /// Base URL of the provider API
    pub base_url: String,
    /// Model identifier sent on each completion call
    pub model: String,
    /// Relative weight for weighted-random selection
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Priority used to order ties (lower is preferred)
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Per-call network timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum idle connections kept pooled for this provider
    #[serde(default = "default_pool_size")]
    pub connection_pool_size: usize,
    /// Secret name holding the API key; defaults to `LLM_API_KEY_<NAME>`
    #[serde(default)]
    pub api_key_secret: Option<String>,
    /// Organization header value (OpenAI)
    #[serde(default)]
    pub organization: Option<String>,
    /// API version header value (Anthropic)
    #[serde(default)]
    pub api_version: Option<String>,
    /// Cost per 1k prompt tokens in USD
    #[serde(default)]
    pub prompt_cost_per_1k: f64,
    /// Cost per 1k completion tokens in USD
    #[serde(default)]
    pub completion_cost_per_1k: f64,
    /// Endpoint probed by out-of-band health checks
    #[serde(default)]
    pub health_endpoint: Option<String>,
}

impl ProviderConfig {
    /// Resolve the secret name holding this provider's API key
    pub fn api_key_secret(&self) -> String {
        self.api_key_secret
            .clone()
            .unwrap_or_else(|| format!("LLM_API_KEY_{}", self.name.to_uppercase()))
    }

    /// Per-call network timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-provider rate limiting defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Default requests per minute
    #[serde(default = "default_rpm")]
    pub default_rpm: u32,
    /// Default tokens per minute
    #[serde(default = "default_tpm")]
    pub default_tpm: u32,
    /// Ceiling for adaptive concurrency
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_rpm: default_rpm(),
            default_tpm: default_tpm(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds the breaker stays open before allowing a trial call
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

impl CircuitBreakerConfig {
    /// Recovery timeout as a duration
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

/// Retry policy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per logical call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in milliseconds before the first retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any computed delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

/// Semantic cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether responses are cached at all
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Maximum number of cached entries before LRU eviction
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
    /// Euclidean distance below which a cached entry is a hit
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Entry lifetime as a duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_size: default_cache_max_size(),
            epsilon: default_epsilon(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Out-of-band health probing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Whether the background probe task runs
    #[serde(default)]
    pub probes_enabled: bool,
    /// Seconds between probe rounds
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            probes_enabled: false,
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_secret_fallback() {
        let config = ProviderConfig {
            name: "groq".to_string(),
            kind: ProviderKind::Groq,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            weight: 1.0,
            priority: 10,
            timeout_secs: 30,
            connection_pool_size: 5,
            api_key_secret: None,
            organization: None,
            api_version: None,
            prompt_cost_per_1k: 0.0,
            completion_cost_per_1k: 0.0,
            health_endpoint: None,
        };
        assert_eq!(config.api_key_secret(), "LLM_API_KEY_GROQ");

        let config = ProviderConfig {
            api_key_secret: Some("GROQ_KEY".to_string()),
            ..config
        };
        assert_eq!(config.api_key_secret(), "GROQ_KEY");
    }

    #[test]
    fn test_serde_defaults() {
        let yaml = r#"
name: openai
kind: open_ai
base_url: https://api.openai.com/v1
model: gpt-4
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.weight, 1.0);
        assert_eq!(config.priority, 100);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.connection_pool_size, 10);
        assert!(config.api_key_secret.is_none());
    }
}
