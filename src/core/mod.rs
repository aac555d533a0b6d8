//! Core routing machinery
//!
//! Everything between a caller's request and a provider's HTTP API: the
//! data model, sanitization, credentials, resilience guards, the semantic
//! cache, provider adapters, and the orchestrating router.

pub mod breaker;
pub mod catalog;
pub mod models;
pub mod providers;
pub mod rate_limiter;
pub mod retry;
pub mod router;
pub mod secrets;
pub mod security;
pub mod semantic_cache;

pub use breaker::{CircuitBreaker, CircuitState};
pub use catalog::{ModelCatalog, ModelEntry};
pub use models::{LlmRequest, LlmResponse, ProviderHealth, RateLimitInfo, TokenUsage};
pub use providers::Provider;
pub use rate_limiter::ProviderRateLimiter;
pub use retry::RetryPolicy;
pub use router::Router;
pub use secrets::{EnvSecretBackend, SecretBackend, SecretStore};
pub use security::SecurityFilter;
pub use semantic_cache::{Embedder, SemanticCache};
