//! # llm-router
//!
//! A resilient multi-provider LLM routing gateway. One logical completion
//! request becomes a guarded call against one of several interchangeable
//! backends, with circuit breaking, adaptive rate limiting, retries with
//! backoff, and an embedding-keyed semantic cache in between.
//!
//! ## Features
//!
//! - **Multi-Provider**: OpenAI, Anthropic, Groq, and Gemini adapters
//!   behind one `Provider` trait
//! - **Resilience**: per-provider circuit breakers, token-bucket rate
//!   limiting with AIMD concurrency, exponential backoff honoring
//!   provider retry hints
//! - **Semantic Caching**: responses reused across prompts whose
//!   embeddings fall within a configurable distance
//! - **Sanitization**: injection-phrase neutralization and PII masking
//!   before anything leaves the process
//! - **Observability**: named counters, latency histograms, and a
//!   per-provider diagnostic snapshot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_router::{Config, LlmRequest, Router, SecretStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secrets = SecretStore::from_env();
//!     let router = Router::new(Config::default(), &secrets).await?;
//!
//!     let response = router
//!         .complete(LlmRequest::new("Say hello in one word"))
//!         .await?;
//!     println!("{} said: {}", response.provider, response.text);
//!
//!     router.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod utils;

// Re-export main types
pub use config::{
    CacheConfig, CircuitBreakerConfig, Config, MonitoringConfig, ProviderConfig, ProviderKind,
    RateLimitConfig, RetryConfig,
};
pub use core::{
    CircuitBreaker, CircuitState, Embedder, LlmRequest, LlmResponse, ModelCatalog, ModelEntry,
    Provider, ProviderHealth, ProviderRateLimiter, RateLimitInfo, RetryPolicy, Router,
    SecretBackend, SecretStore, SecurityFilter, SemanticCache, TokenUsage,
};
pub use monitoring::{MetricsCollector, RouterMetrics, init_tracing};
pub use utils::error::{Result, RouterError};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
