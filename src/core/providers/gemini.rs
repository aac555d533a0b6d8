//! Google Gemini adapter
//!
//! Gemini uses its own payload shape and reports no token usage on the
//! free tier, so usage comes back zeroed.

use super::{
    Provider, build_client, error_from_response, map_send_error, probe_endpoint,
    reset_from_header,
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

/// Google Gemini adapter
pub struct GeminiProvider {
    config: ProviderConfig,
    api_key: String,
    client: reqwest::Client,
    observed: Mutex<RateLimitInfo>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentBody {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
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
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        // The system instruction is folded into the prompt text; the
        // v1beta API has no dedicated system field.
        let prompt = match &request.system_prompt {
            Some(system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_send_error(&self.config.name, self.config.timeout(), e))?;

        let info = self.parse_rate_limit_headers(response.headers());
        self.observed.lock().merge(&info);

        if !response.status().is_success() {
            return Err(error_from_response(&self.config.name, response).await);
        }

        let body: GenerateContentBody = response.json().await.map_err(|e| {
            RouterError::Provider {
                provider: self.config.name.clone(),
                status: None,
                message: format!("malformed response body: {}", e),
            }
        })?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| RouterError::Provider {
                provider: self.config.name.clone(),
                status: None,
                message: "response contained no candidates".to_string(),
            })?;

        Ok(LlmResponse {
            text,
            provider: self.config.name.clone(),
            model: self.config.model.clone(),
            latency_ms: start.elapsed().as_secs_f64() * 1_000.0,
            ttft_ms: None,
            // Free tier: no usage reported, nothing billed
            token_usage: TokenUsage::default(),
            cost_usd: 0.0,
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
            .unwrap_or_else(|| format!("{}/v1beta/models", self.config.base_url));
        probe_endpoint(&self.client, &url).await
    }
}
