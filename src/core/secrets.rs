//! Provider credential resolution with caching
//!
//! Secrets come from a pluggable backend (environment variables by default;
//! cloud secret managers behave identically from the caller's view). A
//! missing credential means "provider unusable", never a hard failure.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const SECRET_CACHE_TTL: Duration = Duration::from_secs(3_600);

/// Backend capable of resolving a named secret
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Fetch the secret value, or `None` when the backend has no such entry
    async fn fetch(&self, name: &str) -> Option<String>;
}

/// Backend reading secrets from process environment variables
pub struct EnvSecretBackend;

#[async_trait]
impl SecretBackend for EnvSecretBackend {
    async fn fetch(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    }
}

struct CachedSecret {
    value: String,
    expires_at: Instant,
}

/// Secret resolver with a one-hour in-memory cache
pub struct SecretStore {
    backend: Arc<dyn SecretBackend>,
    cache: Mutex<HashMap<String, CachedSecret>>,
    ttl: Duration,
}

impl SecretStore {
    /// Create a store over the given backend
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self::with_ttl(backend, SECRET_CACHE_TTL)
    }

    /// Create a store with a custom cache lifetime
    pub fn with_ttl(backend: Arc<dyn SecretBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Store backed by process environment variables
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvSecretBackend))
    }

    /// Resolve a secret, consulting the cache unless `force_refresh` is set
    ///
    /// Returns `None` when the backend has no value; callers must treat that
    /// as "provider unusable" rather than an error.
    pub async fn get_secret(&self, name: &str, force_refresh: bool) -> Option<String> {
        if !force_refresh {
            let cache = self.cache.lock();
            if let Some(cached) = cache.get(name) {
                if Instant::now() < cached.expires_at {
                    return Some(cached.value.clone());
                }
            }
        }

        let value = self.backend.fetch(name).await;
        match &value {
            Some(value) => {
                let mut cache = self.cache.lock();
                cache.insert(
                    name.to_string(),
                    CachedSecret {
                        value: value.clone(),
                        expires_at: Instant::now() + self.ttl,
                    },
                );
            }
            None => debug!("Secret '{}' not found in backend", name),
        }
        value
    }
}
