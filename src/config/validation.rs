//! Configuration validation
//!
//! This module provides validation logic for all configuration structures.

use super::models::*;
use std::collections::HashSet;

/// Validation for configuration structures
pub trait Validate {
    /// Check internal consistency, returning a description of the first problem found
    fn validate(&self) -> Result<(), String>;
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("provider name must not be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "provider '{}' base_url must be an http(s) URL",
                self.name
            ));
        }
        if self.model.is_empty() {
            return Err(format!("provider '{}' model must not be empty", self.name));
        }
        if self.weight < 0.0 {
            return Err(format!("provider '{}' weight must not be negative", self.name));
        }
        if self.timeout_secs == 0 {
            return Err(format!("provider '{}' timeout must be positive", self.name));
        }
        if self.connection_pool_size == 0 {
            return Err(format!(
                "provider '{}' connection_pool_size must be positive",
                self.name
            ));
        }
        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), String> {
        if self.default_rpm == 0 {
            return Err("default_rpm must be positive".to_string());
        }
        if self.default_tpm == 0 {
            return Err("default_tpm must be positive".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be positive".to_string());
        }
        Ok(())
    }
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be positive".to_string());
        }
        if self.recovery_timeout_secs == 0 {
            return Err("recovery_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be positive".to_string());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("base_delay_ms must not exceed max_delay_ms".to_string());
        }
        if self.backoff_factor < 1.0 {
            return Err("backoff_factor must be at least 1.0".to_string());
        }
        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.max_size == 0 {
            return Err("cache max_size must be positive when enabled".to_string());
        }
        if self.epsilon <= 0.0 {
            return Err("cache epsilon must be positive".to_string());
        }
        if self.ttl_secs == 0 {
            return Err("cache ttl_secs must be positive".to_string());
        }
        Ok(())
    }
}

/// Reject duplicate provider names across the registry
pub fn validate_unique_names(providers: &[ProviderConfig]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for provider in providers {
        if !seen.insert(provider.name.as_str()) {
            return Err(format!("duplicate provider name '{}'", provider.name));
        }
    }
    Ok(())
}
