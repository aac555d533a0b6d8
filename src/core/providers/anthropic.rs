//! Anthropic Claude adapter
//!
//! Speaks the messages API. Anthropic puts the system instruction in a
//! top-level field and counts tokens as input/output rather than
//! prompt/completion.

use super::{
    Provider, build_client, error_from_response, estimate_cost, header_u32, map_send_error,
    probe_endpoint, reset_from_header,
};
use crate::config::ProviderConfig;
use crate::core::models::{LlmRequest, LlmResponse, RateLimitInfo, TokenUsage};
use crate::utils::error::{Result, RouterError};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;

const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Anthropic messages adapter
pub struct AnthropicProvider {
    config: ProviderConfig,
    api_key: String,
    client: reqwest::Client,
    observed: Mutex<RateLimitInfo>,
}

#[derive(Debug, Deserialize)]
struct MessagesBody {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicProvider {
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

    fn api_version(&self) -> &str {
        self.config.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let url = format!("{}/messages", self.config.base_url);

        let payload = json!({
            "model": self.config.model,
            "system": request
                .system_prompt
                .as_deref()
                .unwrap_or("You are a helpful assistant."),
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", self.api_version())
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_send_error(&self.config.name, self.config.timeout(), e))?;

        let info = self.parse_rate_limit_headers(response.headers());
        self.observed.lock().merge(&info);

        if !response.status().is_success() {
            return Err(error_from_response(&self.config.name, response).await);
        }

        let body: MessagesBody = response.json().await.map_err(|e| {
            RouterError::Provider {
                provider: self.config.name.clone(),
                status: None,
                message: format!("malformed response body: {}", e),
            }
        })?;

        let text = body
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| RouterError::Provider {
                provider: self.config.name.clone(),
                status: None,
                message: "response contained no content blocks".to_string(),
            })?;

        let usage = body.usage.unwrap_or_default();
        let token_usage = TokenUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        };

        Ok(LlmResponse {
            text,
            provider: self.config.name.clone(),
            model: self.config.model.clone(),
            latency_ms: start.elapsed().as_secs_f64() * 1_000.0,
            ttft_ms: None,
            cost_usd: estimate_cost(&self.config, &token_usage),
            token_usage,
            cached: false,
            trace_id: request.trace_id.clone(),
        })
    }

    fn parse_rate_limit_headers(&self, headers: &HeaderMap) -> RateLimitInfo {
        RateLimitInfo {
            remaining_requests: header_u32(headers, "anthropic-ratelimit-requests-remaining"),
            remaining_tokens: header_u32(headers, "anthropic-ratelimit-tokens-remaining"),
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
