//! Groq adapter
//!
//! Groq serves an OpenAI-compatible chat completions API at very high
//! throughput; the only quota signal it exposes is `retry-after`.

use super::{
    ChatCompletionBody, Provider, build_client, chat_payload, error_from_response,
    map_send_error, probe_endpoint, reset_from_header,
};
use crate::config::ProviderConfig;
use crate::core::models::{LlmRequest, LlmResponse, RateLimitInfo};
use crate::utils::error::{Result, RouterError};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use std::time::Instant;

/// Groq fast-inference adapter
pub struct GroqProvider {
    config: ProviderConfig,
    api_key: String,
    client: reqwest::Client,
    observed: Mutex<RateLimitInfo>,
}

impl GroqProvider {
    /// Create the adapter with its own pooled client
    pub fn new(config: ProviderConfig, api_key: String) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self {
            config,
            api_key,
            client,
            observed: Mutex::new(RateLimitInfo::default()),
        })
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_payload(&self.config.model, request))
            .send()
            .await
            .map_err(|e| map_send_error(&self.config.name, self.config.timeout(), e))?;

        let info = self.parse_rate_limit_headers(response.headers());
        self.observed.lock().merge(&info);

        if !response.status().is_success() {
            return Err(error_from_response(&self.config.name, response).await);
        }

        let body: ChatCompletionBody = response.json().await.map_err(|e| {
            RouterError::Provider {
                provider: self.config.name.clone(),
                status: None,
                message: format!("malformed response body: {}", e),
            }
        })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RouterError::Provider {
                provider: self.config.name.clone(),
                status: None,
                message: "response contained no choices".to_string(),
            })?;

        let token_usage = body.usage.unwrap_or_default().into_token_usage();
        Ok(LlmResponse {
            text,
            provider: self.config.name.clone(),
            model: self.config.model.clone(),
            latency_ms: start.elapsed().as_secs_f64() * 1_000.0,
            ttft_ms: None,
            // Groq's free tier reports usage but bills nothing
            cost_usd: 0.0,
            token_usage,
            cached: false,
            trace_id: request.trace_id.clone(),
        })
    }

    fn parse_rate_limit_headers(&self, headers: &HeaderMap) -> RateLimitInfo {
        RateLimitInfo {
            remaining_requests: None,
            remaining_tokens: None,
            reset_at: reset_from_header(headers, "retry-after"),
        }
    }

    fn observed_limits(&self) -> RateLimitInfo {
        *self.observed.lock()
    }

    async fn health_check(&self) -> bool {
        let url = self
            .config
            .health_endpoint
            .clone()
            .unwrap_or_else(|| format!("{}/models", self.config.base_url));
        probe_endpoint(&self.client, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn test_only_retry_after_is_parsed() {
        let config = crate::config::Config::default()
            .provider("groq")
            .unwrap()
            .clone();
        let provider = GroqProvider::new(config, "gsk-test".to_string()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining-requests"),
            HeaderValue::from_static("5"),
        );
        headers.insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_static("7"),
        );

        let info = provider.parse_rate_limit_headers(&headers);
        assert_eq!(info.remaining_requests, None);
        assert_eq!(info.remaining_tokens, None);
        assert!(info.reset_at.is_some());
    }
}
