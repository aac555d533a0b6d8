//! Request orchestration across providers
//!
//! One `Router` owns every per-provider resource: adapter, circuit breaker,
//! rate limiter, and health record. Calls to different providers proceed
//! fully in parallel; per-provider state is serialized under that
//! provider's own locks, and there is no global lock across the router.

use crate::config::Config;
use crate::core::breaker::CircuitBreaker;
use crate::core::catalog::{ModelCatalog, ModelEntry};
use crate::core::models::{LlmRequest, LlmResponse, ProviderHealth};
use crate::core::providers::{Provider, build_provider};
use crate::core::rate_limiter::ProviderRateLimiter;
use crate::core::retry::RetryPolicy;
use crate::core::secrets::SecretStore;
use crate::core::security::SecurityFilter;
use crate::core::semantic_cache::{Embedder, SemanticCache};
use crate::monitoring::{HealthMonitor, MetricsCollector, ProviderMetrics, RouterMetrics};
use crate::utils::error::{Result, RouterError};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runtime state for one provider: the adapter plus its guards
pub(crate) struct ProviderSlot {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) config: crate::config::ProviderConfig,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) limiter: ProviderRateLimiter,
    pub(crate) health: Mutex<ProviderHealth>,
}

/// Multi-provider completion router
pub struct Router {
    slots: Arc<DashMap<String, Arc<ProviderSlot>>>,
    /// Declaration order, for deterministic iteration and tie-breaking
    order: Vec<String>,
    security: SecurityFilter,
    cache: SemanticCache,
    retry: RetryPolicy,
    metrics: Arc<MetricsCollector>,
    monitor: Option<HealthMonitor>,
    config: Config,
}

impl Router {
    /// Build a router, resolving each provider's credential from the store
    ///
    /// Providers whose secret cannot be resolved are skipped with a warning
    /// rather than failing construction.
    pub async fn new(config: Config, secrets: &SecretStore) -> Result<Self> {
        Self::with_embedder(config, secrets, None).await
    }

    /// Build a router with an embedding function for semantic caching
    pub async fn with_embedder(
        config: Config,
        secrets: &SecretStore,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        config.validate()?;

        let slots: Arc<DashMap<String, Arc<ProviderSlot>>> = Arc::new(DashMap::new());
        let mut order = Vec::new();

        for provider_config in &config.providers {
            let secret_name = provider_config.api_key_secret();
            let Some(api_key) = secrets.get_secret(&secret_name, false).await else {
                warn!(
                    provider = %provider_config.name,
                    secret = %secret_name,
                    "No API key found, skipping provider"
                );
                continue;
            };

            let provider = build_provider(provider_config, api_key)?;
            let slot = Arc::new(ProviderSlot {
                provider,
                breaker: CircuitBreaker::new(&provider_config.name, &config.circuit_breaker),
                limiter: ProviderRateLimiter::new(&config.rate_limits),
                health: Mutex::new(ProviderHealth::new(config.rate_limits.max_concurrency)),
                config: provider_config.clone(),
            });
            info!(provider = %provider_config.name, "Initialized provider");
            slots.insert(provider_config.name.clone(), slot);
            order.push(provider_config.name.clone());
        }

        if order.is_empty() {
            warn!("No provider has a resolvable credential; every call will fail");
        }

        // Candidates are offered by priority, then declaration order; the
        // weighted roll breaks remaining ties toward the first match
        order.sort_by_key(|name| {
            config
                .provider(name)
                .map(|p| p.priority)
                .unwrap_or(u32::MAX)
        });

        let monitor = if config.monitoring.probes_enabled {
            let providers: Vec<Arc<dyn Provider>> = order
                .iter()
                .filter_map(|name| slots.get(name).map(|s| s.provider.clone()))
                .collect();
            let map = slots.clone();
            Some(HealthMonitor::spawn(
                providers,
                std::time::Duration::from_secs(config.monitoring.probe_interval_secs),
                move |event| {
                    if let Some(slot) = map.get(&event.provider) {
                        let mut health = slot.health.lock();
                        if event.reachable {
                            // A breaker in cool-down keeps its own verdict
                            if health.circuit_open_until.is_none() {
                                health.healthy = true;
                            }
                        } else {
                            health.healthy = false;
                        }
                    }
                },
            ))
        } else {
            None
        };

        Ok(Self {
            slots,
            order,
            security: SecurityFilter::new(),
            cache: SemanticCache::new(config.cache.clone(), embedder),
            retry: RetryPolicy::new(&config.retry),
            metrics: Arc::new(MetricsCollector::new()),
            monitor,
            config,
        })
    }

    /// Route one completion request with full resilience
    pub async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        if request.prompt.trim().is_empty() {
            return Err(RouterError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }

        let request = self.security.sanitize(request);

        if self.config.cache.enabled {
            if let Some(mut response) = self.cache.get(&request).await {
                self.metrics.record_cache_hit();
                debug!(trace_id = %request.trace_id, "Serving response from semantic cache");
                response.trace_id = request.trace_id.clone();
                return Ok(response);
            }
            self.metrics.record_cache_miss();
        }

        let slot = match self.select_provider(&request) {
            Ok(slot) => slot,
            Err(err) => {
                self.metrics.record_error();
                return Err(err);
            }
        };
        let provider_name = slot.provider.name().to_string();

        let estimated_tokens = request.estimated_tokens();
        if !slot.limiter.acquire(estimated_tokens) {
            self.metrics.record_error();
            return Err(RouterError::RateLimited {
                provider: provider_name,
            });
        }

        {
            let mut health = slot.health.lock();
            health.current_concurrency =
                (health.current_concurrency + 1).min(health.max_concurrency);
        }

        let timeout = slot.config.timeout();
        let start = Instant::now();

        let result = self
            .retry
            .execute(|| {
                let provider = Arc::clone(&slot.provider);
                let breaker = &slot.breaker;
                let request = &request;
                async move {
                    breaker
                        .call(|| async move {
                            match tokio::time::timeout(timeout, provider.complete(request)).await
                            {
                                Ok(result) => result,
                                Err(_) => Err(RouterError::Timeout {
                                    provider: provider.name().to_string(),
                                    timeout,
                                }),
                            }
                        })
                        .await
                }
            })
            .await;

        {
            let mut health = slot.health.lock();
            health.current_concurrency = health.current_concurrency.saturating_sub(1);
        }

        match result {
            Ok(mut response) => {
                let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;
                response.latency_ms = latency_ms;
                response.trace_id = request.trace_id.clone();
                response.cached = false;

                let limits = slot.provider.observed_limits();
                slot.limiter.update_from_headers(&limits);
                {
                    let mut health = slot.health.lock();
                    health.record_success(latency_ms);
                    health.update_quota(&limits);
                }
                self.metrics.record_success(
                    latency_ms,
                    response.ttft_ms,
                    response.token_usage.total_tokens as u64,
                    response.cost_usd,
                );

                if self.config.cache.enabled {
                    self.cache.put(&request, &response).await;
                }

                info!(
                    provider = %provider_name,
                    trace_id = %request.trace_id,
                    latency_ms,
                    "Completion served"
                );
                Ok(response)
            }
            Err(err) => {
                {
                    let mut health = slot.health.lock();
                    health.record_failure();
                    // Mirror the breaker's verdict into the health record
                    if let Some(remaining) = slot.breaker.open_remaining() {
                        health.healthy = false;
                        health.circuit_open_until = Some(
                            Utc::now()
                                + chrono::Duration::from_std(remaining)
                                    .unwrap_or_else(|_| chrono::Duration::seconds(60)),
                        );
                    }
                }
                self.metrics.record_error();
                warn!(
                    provider = %provider_name,
                    trace_id = %request.trace_id,
                    error = %err,
                    "Completion failed"
                );
                Err(err)
            }
        }
    }

    /// Pick a provider: preference filter, then health filter, then
    /// weighted random among the survivors
    fn select_provider(&self, request: &LlmRequest) -> Result<Arc<ProviderSlot>> {
        let mut candidates = Vec::new();
        let mut cooling: Option<String> = None;
        for name in &self.order {
            let Some(slot) = self.slots.get(name) else {
                continue;
            };
            let slot = Arc::clone(&slot);

            if let Some(preference) = &request.model_preference {
                if slot.config.name != *preference && slot.config.model != *preference {
                    continue;
                }
            }
            if !slot.breaker.is_call_permitted() {
                debug!(provider = %name, "Circuit breaker cooling down, skipping");
                if cooling.is_none() {
                    cooling = Some(name.clone());
                }
                continue;
            }
            if !self.health_eligible(&slot) {
                debug!(provider = %name, "Provider unhealthy, skipping");
                continue;
            }
            candidates.push(slot);
        }

        if candidates.is_empty() {
            // A lone cooling breaker fails fast with its own error so the
            // caller can distinguish "wait" from "nothing configured"
            if let Some(provider) = cooling {
                return Err(RouterError::CircuitOpen { provider });
            }
            // A preference pinning a provider that never resolved its
            // credential names the missing secret instead
            if let Some(preference) = &request.model_preference {
                if let Some(skipped) = self.config.provider(preference) {
                    if !self.slots.contains_key(&skipped.name) {
                        return Err(RouterError::SecretUnavailable {
                            name: skipped.api_key_secret(),
                        });
                    }
                }
            }
            return Err(RouterError::AllProvidersUnhealthy);
        }

        let mut weights: Vec<f64> = candidates
            .iter()
            .map(|slot| slot.config.weight.max(0.0))
            .collect();
        let mut total: f64 = weights.iter().sum();
        if total <= 0.0 {
            weights = vec![1.0; candidates.len()];
            total = weights.len() as f64;
        }

        let roll = rand::thread_rng().r#gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (slot, weight) in candidates.iter().zip(&weights) {
            cumulative += weight;
            if roll <= cumulative {
                return Ok(Arc::clone(slot));
            }
        }
        Ok(Arc::clone(&candidates[0]))
    }

    /// Health-record eligibility, checked after the breaker has permitted
    /// the call
    fn health_eligible(&self, slot: &ProviderSlot) -> bool {
        let health = slot.health.lock();
        if health.healthy {
            return true;
        }
        // A tripped provider becomes a trial candidate once its cool-down
        // has elapsed; one marked down by probing stays out until re-probed.
        match health.circuit_open_until {
            Some(until) => Utc::now() >= until,
            None => false,
        }
    }

    /// Advisory model suggestion for a request, from the static catalog
    pub fn model_hint(&self, request: &LlmRequest) -> Option<&'static ModelEntry> {
        let task = ModelCatalog::infer_task(&request.prompt)?;
        ModelCatalog::model_for_task(task)
    }

    /// Diagnostic snapshot across providers, cache, and counters
    pub fn get_metrics(&self) -> RouterMetrics {
        let mut providers = HashMap::new();
        for name in &self.order {
            if let Some(slot) = self.slots.get(name) {
                let health = slot.health.lock();
                providers.insert(
                    name.clone(),
                    ProviderMetrics {
                        healthy: health.healthy,
                        total_requests: health.total_requests,
                        total_errors: health.total_errors,
                        avg_latency_ms: health.avg_latency_ms,
                        consecutive_failures: health.consecutive_failures,
                    },
                );
            }
        }

        let (counters, latency_ms, ttft_ms) = self.metrics.snapshot();
        RouterMetrics {
            providers,
            cache: self.cache.stats(),
            counters,
            latency_ms,
            ttft_ms,
        }
    }

    /// Copy of one provider's health record
    pub fn provider_health(&self, name: &str) -> Option<ProviderHealth> {
        self.slots.get(name).map(|slot| slot.health.lock().clone())
    }

    /// Names of configured providers that resolved a credential
    pub fn provider_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Stop background probing; provider pools drop with the router
    pub fn shutdown(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.shutdown();
        }
        info!("Router shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RateLimitInfo;
    use async_trait::async_trait;

    struct StubProvider {
        name: String,
        fail: bool,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            if self.fail {
                return Err(RouterError::Provider {
                    provider: self.name.clone(),
                    status: Some(500),
                    message: "stub failure".to_string(),
                });
            }
            Ok(LlmResponse {
                text: "pong".to_string(),
                provider: self.name.clone(),
                model: "stub-model".to_string(),
                latency_ms: 1.0,
                ttft_ms: None,
                token_usage: Default::default(),
                cost_usd: 0.0,
                cached: false,
                trace_id: request.trace_id.clone(),
            })
        }

        fn parse_rate_limit_headers(
            &self,
            _headers: &reqwest::header::HeaderMap,
        ) -> RateLimitInfo {
            RateLimitInfo::default()
        }

        fn observed_limits(&self) -> RateLimitInfo {
            RateLimitInfo::default()
        }

        async fn health_check(&self) -> bool {
            !self.fail
        }
    }

    fn stub_router(providers: Vec<(&str, f64, bool)>) -> Router {
        let mut config = Config::default();
        config.providers.truncate(0);

        let slots: Arc<DashMap<String, Arc<ProviderSlot>>> = Arc::new(DashMap::new());
        let mut order = Vec::new();
        for (name, weight, fail) in providers {
            let mut provider_config = Config::default().providers[0].clone();
            provider_config.name = name.to_string();
            provider_config.weight = weight;
            config.providers.push(provider_config.clone());

            let slot = Arc::new(ProviderSlot {
                provider: Arc::new(StubProvider {
                    name: name.to_string(),
                    fail,
                }),
                breaker: CircuitBreaker::new(name, &config.circuit_breaker),
                limiter: ProviderRateLimiter::new(&config.rate_limits),
                health: Mutex::new(ProviderHealth::new(config.rate_limits.max_concurrency)),
                config: provider_config,
            });
            slots.insert(name.to_string(), slot);
            order.push(name.to_string());
        }

        Router {
            slots,
            order,
            security: SecurityFilter::new(),
            cache: SemanticCache::new(config.cache.clone(), None),
            retry: RetryPolicy::new(&crate::config::RetryConfig {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 5,
                backoff_factor: 2.0,
            }),
            metrics: Arc::new(MetricsCollector::new()),
            monitor: None,
            config,
        }
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let router = stub_router(vec![("stub", 1.0, false)]);
        let result = router.complete(LlmRequest::new("   ")).await;
        assert!(matches!(result, Err(RouterError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_happy_path_updates_metrics() {
        let router = stub_router(vec![("stub", 1.0, false)]);
        let response = router.complete(LlmRequest::new("ping")).await.unwrap();
        assert_eq!(response.text, "pong");
        assert!(!response.cached);
        assert!(!response.trace_id.is_empty());

        let metrics = router.get_metrics();
        assert_eq!(metrics.counters.requests_success, 1);
        assert_eq!(metrics.counters.requests_total, 1);
        assert_eq!(metrics.providers["stub"].total_requests, 1);
        assert!(metrics.providers["stub"].healthy);
    }

    #[tokio::test]
    async fn test_no_providers_is_unhealthy_error() {
        let router = stub_router(vec![]);
        let result = router.complete(LlmRequest::new("ping")).await;
        assert!(matches!(result, Err(RouterError::AllProvidersUnhealthy)));
    }

    #[tokio::test]
    async fn test_preference_filters_providers() {
        let router = stub_router(vec![("alpha", 1.0, false), ("beta", 1.0, false)]);

        let request = LlmRequest::new("ping").with_preference("beta");
        let response = router.complete(request).await.unwrap();
        assert_eq!(response.provider, "beta");

        let request = LlmRequest::new("ping").with_preference("nonexistent");
        let result = router.complete(request).await;
        assert!(matches!(result, Err(RouterError::AllProvidersUnhealthy)));
    }

    #[tokio::test]
    async fn test_failure_updates_health_and_propagates() {
        let router = stub_router(vec![("flaky", 1.0, true)]);
        let result = router.complete(LlmRequest::new("ping")).await;
        assert!(matches!(result, Err(RouterError::Provider { .. })));

        let health = router.provider_health("flaky").unwrap();
        assert_eq!(health.consecutive_failures, 1);
        assert_eq!(health.total_errors, 1);

        let metrics = router.get_metrics();
        assert_eq!(metrics.counters.requests_error, 1);
    }

    #[tokio::test]
    async fn test_weighted_selection_respects_zero_weight() {
        // One provider carries all the weight; the other must never win
        let router = stub_router(vec![("heavy", 1.0, false), ("zero", 0.0, false)]);
        for _ in 0..20 {
            let response = router.complete(LlmRequest::new("ping")).await.unwrap();
            assert_eq!(response.provider, "heavy");
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let router = stub_router(vec![("stub", 1.0, false)]);

        let request = LlmRequest::new("ping").with_embedding(vec![0.5, 0.5]);
        let first = router.complete(request).await.unwrap();
        assert!(!first.cached);

        // Same embedding, different trace: served from cache
        let request = LlmRequest::new("ping again").with_embedding(vec![0.5, 0.5]);
        let second = router.complete(request.clone()).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.text, first.text);
        assert_eq!(second.trace_id, request.trace_id);

        let metrics = router.get_metrics();
        assert_eq!(metrics.counters.cache_hits, 1);
        assert_eq!(metrics.providers["stub"].total_requests, 1);
    }

    #[tokio::test]
    async fn test_model_hint_is_advisory() {
        let router = stub_router(vec![("stub", 1.0, false)]);
        let request = LlmRequest::new("Write a Python function to parse JSON");
        let hint = router.model_hint(&request).unwrap();
        assert!(hint.capabilities.contains(&"coding"));
    }
}
