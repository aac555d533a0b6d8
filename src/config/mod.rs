//! Configuration management for the routing gateway
//!
//! This module handles loading, validation, and defaults for all router
//! configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{Result, RouterError};
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration for the router
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Provider registry, in declaration order
    pub providers: Vec<ProviderConfig>,
    /// Rate limiting defaults applied per provider
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Circuit breaker thresholds applied per provider
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry policy parameters
    #[serde(default)]
    pub retry: RetryConfig,
    /// Semantic cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Health probing settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RouterError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| RouterError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(RouterError::Config(
                "at least one provider must be configured".to_string(),
            ));
        }

        validation::validate_unique_names(&self.providers)
            .map_err(RouterError::Config)?;

        for provider in &self.providers {
            provider
                .validate()
                .map_err(|e| RouterError::Config(format!("Provider config error: {}", e)))?;
        }

        self.rate_limits
            .validate()
            .map_err(|e| RouterError::Config(format!("Rate limit config error: {}", e)))?;
        self.circuit_breaker
            .validate()
            .map_err(|e| RouterError::Config(format!("Circuit breaker config error: {}", e)))?;
        self.retry
            .validate()
            .map_err(|e| RouterError::Config(format!("Retry config error: {}", e)))?;
        self.cache
            .validate()
            .map_err(|e| RouterError::Config(format!("Cache config error: {}", e)))?;

        Ok(())
    }

    /// Look up one provider's configuration by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

impl Default for Config {
    /// Built-in registry covering the four stock providers
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderConfig {
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
                },
                ProviderConfig {
                    name: "openai".to_string(),
                    kind: ProviderKind::OpenAi,
                    base_url: "https://api.openai.com/v1".to_string(),
                    model: "gpt-4".to_string(),
                    weight: 1.0,
                    priority: 20,
                    timeout_secs: 30,
                    connection_pool_size: 5,
                    api_key_secret: None,
                    organization: None,
                    api_version: None,
                    prompt_cost_per_1k: 0.01,
                    completion_cost_per_1k: 0.03,
                    health_endpoint: None,
                },
                ProviderConfig {
                    name: "anthropic".to_string(),
                    kind: ProviderKind::Anthropic,
                    base_url: "https://api.anthropic.com/v1".to_string(),
                    model: "claude-3-opus-20240229".to_string(),
                    weight: 0.5,
                    priority: 30,
                    timeout_secs: 45,
                    connection_pool_size: 3,
                    api_key_secret: None,
                    organization: None,
                    api_version: Some("2023-06-01".to_string()),
                    prompt_cost_per_1k: 0.008,
                    completion_cost_per_1k: 0.024,
                    health_endpoint: None,
                },
                ProviderConfig {
                    name: "gemini".to_string(),
                    kind: ProviderKind::Gemini,
                    base_url: "https://generativelanguage.googleapis.com".to_string(),
                    model: "gemini-pro".to_string(),
                    weight: 0.3,
                    priority: 40,
                    timeout_secs: 30,
                    connection_pool_size: 2,
                    api_key_secret: None,
                    organization: None,
                    api_version: None,
                    prompt_cost_per_1k: 0.0,
                    completion_cost_per_1k: 0.0,
                    health_endpoint: None,
                },
            ],
            rate_limits: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.len(), 4);
        assert!(config.provider("anthropic").is_some());
        assert!(config.provider("missing").is_none());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
providers:
  - name: groq
    kind: groq
    base_url: https://api.groq.com/openai/v1
    model: llama3-8b-8192
    priority: 10
cache:
  max_size: 50
  epsilon: 0.2
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_empty_providers_rejected() {
        let yaml = "providers: []";
        assert!(Config::from_yaml(yaml).is_err());
    }
}
