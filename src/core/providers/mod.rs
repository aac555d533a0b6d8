//! Provider capability surface and concrete adapters
//!
//! Every backend is reached through the `Provider` trait; the router never
//! names a concrete adapter type. Header vocabularies differ per provider
//! and are absorbed here so the rest of the system sees one normalized
//! shape.

pub mod anthropic;
pub mod gemini;
pub mod groq;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use openai::OpenAiProvider;

use crate::config::{ProviderConfig, ProviderKind};
use crate::core::models::{LlmRequest, LlmResponse, RateLimitInfo, TokenUsage};
use crate::utils::error::{Result, RouterError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;

// A 429 with no Retry-After header still gets a conservative backoff hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability surface every backend adapter implements
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name used in routing, metrics, and errors
    fn name(&self) -> &str;

    /// Model identifier sent on completion calls
    fn model(&self) -> &str;

    /// Execute one completion attempt against the backend
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Normalize this provider's rate-limit header vocabulary
    fn parse_rate_limit_headers(&self, headers: &HeaderMap) -> RateLimitInfo;

    /// Most recent quota information observed on a live response
    fn observed_limits(&self) -> RateLimitInfo;

    /// Out-of-band liveness probe
    async fn health_check(&self) -> bool;
}

/// Build the adapter for one provider entry
pub fn build_provider(config: &ProviderConfig, api_key: String) -> Result<Arc<dyn Provider>> {
    Ok(match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config.clone(), api_key)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config.clone(), api_key)?),
        ProviderKind::Groq => Arc::new(GroqProvider::new(config.clone(), api_key)?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config.clone(), api_key)?),
    })
}

/// One pooled HTTP client per adapter, bounded per configuration
pub(super) fn build_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .pool_max_idle_per_host(config.connection_pool_size)
        .build()
        .map_err(|e| {
            RouterError::Config(format!(
                "Failed to build HTTP client for '{}': {}",
                config.name, e
            ))
        })
}

/// Map a transport-level failure onto the error taxonomy
pub(super) fn map_send_error(
    provider: &str,
    timeout: Duration,
    error: reqwest::Error,
) -> RouterError {
    if error.is_timeout() {
        RouterError::Timeout {
            provider: provider.to_string(),
            timeout,
        }
    } else {
        RouterError::Provider {
            provider: provider.to_string(),
            status: None,
            message: error.to_string(),
        }
    }
}

/// Turn a non-2xx response into a typed error, consuming the body
pub(super) async fn error_from_response(
    provider: &str,
    response: reqwest::Response,
) -> RouterError {
    let status = response.status();
    if status.as_u16() == 429 {
        let retry_after = header_u64(response.headers(), "retry-after")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return RouterError::ProviderRateLimited {
            provider: provider.to_string(),
            retry_after: Some(retry_after),
        };
    }

    let body = response.text().await.unwrap_or_default();
    RouterError::Provider {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        message: truncate_body(&body),
    }
}

/// Numeric header value, when present and parseable
pub(super) fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

pub(super) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Reset instant derived from a seconds-from-now header
pub(super) fn reset_from_header(headers: &HeaderMap, name: &str) -> Option<chrono::DateTime<Utc>> {
    let secs = header_u64(headers, name)?;
    Some(Utc::now() + chrono::Duration::seconds(secs as i64))
}

/// Cost estimate from configured per-1k rates
pub(super) fn estimate_cost(config: &ProviderConfig, usage: &TokenUsage) -> f64 {
    usage.prompt_tokens as f64 * config.prompt_cost_per_1k / 1_000.0
        + usage.completion_tokens as f64 * config.completion_cost_per_1k / 1_000.0
}

/// Probe a health endpoint, treating any 2xx as alive
pub(super) async fn probe_endpoint(client: &reqwest::Client, url: &str) -> bool {
    match client
        .get(url)
        .timeout(HEALTH_PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// OpenAI-style chat payload, shared by compatible providers
pub(super) fn chat_payload(model: &str, request: &LlmRequest) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": request
                    .system_prompt
                    .as_deref()
                    .unwrap_or("You are a helpful assistant."),
            },
            {"role": "user", "content": request.prompt},
        ],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "stream": false,
    })
}

/// OpenAI-style chat completion body, shared by compatible providers
#[derive(Debug, serde::Deserialize)]
pub(super) struct ChatCompletionBody {
    pub(super) choices: Vec<ChatChoice>,
    #[serde(default)]
    pub(super) usage: Option<ChatUsage>,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct ChatChoice {
    pub(super) message: ChatChoiceMessage,
}

#[derive(Debug, serde::Deserialize)]
pub(super) struct ChatChoiceMessage {
    #[serde(default)]
    pub(super) content: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct ChatUsage {
    #[serde(default)]
    pub(super) prompt_tokens: u32,
    #[serde(default)]
    pub(super) completion_tokens: u32,
    #[serde(default)]
    pub(super) total_tokens: u32,
}

impl ChatUsage {
    pub(super) fn into_token_usage(self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens,
        }
    }
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 256;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let mut end = LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn test_header_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining-requests"),
            HeaderValue::from_static("42"),
        );
        headers.insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_static("not-a-number"),
        );

        assert_eq!(header_u32(&headers, "x-ratelimit-remaining-requests"), Some(42));
        assert_eq!(header_u32(&headers, "retry-after"), None);
        assert_eq!(header_u32(&headers, "absent"), None);
    }

    #[test]
    fn test_cost_estimate() {
        let mut config = crate::config::Config::default();
        let provider = config.providers.remove(1); // openai: 0.01 / 0.03 per 1k
        let usage = TokenUsage {
            prompt_tokens: 1_000,
            completion_tokens: 2_000,
            total_tokens: 3_000,
        };
        let cost = estimate_cost(&provider, &usage);
        assert!((cost - 0.07).abs() < 1e-9);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "x".repeat(1_000);
        assert!(truncate_body(&long).len() < 300);
    }
}
