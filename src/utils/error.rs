//! Error handling for the router
//!
//! This module defines all error types used throughout the routing gateway.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for the router
pub type Result<T> = std::result::Result<T, RouterError>;

/// Main error type for the routing gateway
#[derive(Error, Debug)]
pub enum RouterError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input, rejected before any network activity
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Local limiter refusal; the caller may retry later
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimited {
        /// Provider whose limiter refused the call
        provider: String,
    },

    /// Remote HTTP 429, carrying the provider-declared retry hint
    #[error("Provider '{provider}' rate limited (429)")]
    ProviderRateLimited {
        /// Provider that returned 429
        provider: String,
        /// Retry-After duration parsed from the response, if present
        retry_after: Option<Duration>,
    },

    /// Non-429 HTTP failure or malformed provider response
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        /// Provider that failed
        provider: String,
        /// HTTP status, when the failure came from a response
        status: Option<u16>,
        /// Underlying cause
        message: String,
    },

    /// Network call exceeded the per-provider deadline
    #[error("Timeout after {timeout:?} calling provider '{provider}'")]
    Timeout {
        /// Provider that timed out
        provider: String,
        /// Configured deadline that elapsed
        timeout: Duration,
    },

    /// Circuit breaker open: the call failed fast without touching the network
    #[error("Circuit breaker open for provider '{provider}'")]
    CircuitOpen {
        /// Provider whose breaker is open
        provider: String,
    },

    /// No candidate provider survived preference and health filtering
    #[error("All providers unhealthy or unavailable")]
    AllProvidersUnhealthy,

    /// Credential missing from the secret backend
    #[error("Secret '{name}' unavailable")]
    SecretUnavailable {
        /// Name of the missing secret
        name: String,
    },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouterError {
    /// Whether the retry policy may attempt this call again.
    ///
    /// Transient provider faults (429, 5xx, timeouts) are retryable; local
    /// refusals and input errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderRateLimited { .. } | Self::Provider { .. } | Self::Timeout { .. }
        )
    }

    /// Provider-supplied retry hint, when the failure carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ProviderRateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Name of the provider involved in this failure, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::RateLimited { provider }
            | Self::ProviderRateLimited { provider, .. }
            | Self::Provider { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::CircuitOpen { provider } => Some(provider),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let err = RouterError::Provider {
            provider: "openai".to_string(),
            status: Some(500),
            message: "internal error".to_string(),
        };
        assert!(err.is_retryable());

        let err = RouterError::Timeout {
            provider: "groq".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.is_retryable());

        assert!(!RouterError::InvalidRequest("empty prompt".to_string()).is_retryable());
        assert!(
            !RouterError::CircuitOpen {
                provider: "gemini".to_string()
            }
            .is_retryable()
        );
        assert!(
            !RouterError::RateLimited {
                provider: "openai".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_retry_after_hint() {
        let err = RouterError::ProviderRateLimited {
            provider: "anthropic".to_string(),
            retry_after: Some(Duration::from_secs(12)),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        let err = RouterError::Provider {
            provider: "anthropic".to_string(),
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_provider_accessor() {
        let err = RouterError::CircuitOpen {
            provider: "groq".to_string(),
        };
        assert_eq!(err.provider(), Some("groq"));
        assert_eq!(RouterError::AllProvidersUnhealthy.provider(), None);
    }
}
