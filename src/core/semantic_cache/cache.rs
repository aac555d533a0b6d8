//! Core semantic cache implementation

use super::types::{CacheEntry, CacheStats, Embedder};
use crate::config::CacheConfig;
use crate::core::models::{LlmRequest, LlmResponse};
use chrono::Utc;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct CacheInner {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Embedding-distance response cache
///
/// Lookup and insertion are non-blocking; the single mutex is held only for
/// the in-memory scan, never across an await point. Requests with no
/// embedding — attached or computable through the injected embedder — are
/// never cached and never produce a hit.
pub struct SemanticCache {
    config: CacheConfig,
    embedder: Option<Arc<dyn Embedder>>,
    inner: Mutex<CacheInner>,
}

impl SemanticCache {
    /// Create a cache; `embedder` is optional and only consulted for
    /// requests that carry no precomputed embedding
    pub fn new(config: CacheConfig, embedder: Option<Arc<dyn Embedder>>) -> Self {
        let capacity = NonZeroUsize::new(config.max_size.max(1)).expect("capacity is nonzero");
        info!(
            max_size = config.max_size,
            epsilon = config.epsilon,
            "Initializing semantic cache"
        );
        Self {
            config,
            embedder,
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up a response for a similar prior request
    ///
    /// Returns a clone of the cached response with its `cached` flag set,
    /// or `None` when no unexpired entry lies within the radius.
    pub async fn get(&self, request: &LlmRequest) -> Option<LlmResponse> {
        if !self.config.enabled {
            return None;
        }
        let embedding = self.resolve_embedding(request).await?;

        let mut inner = self.inner.lock();
        let ttl = chrono::Duration::from_std(self.config.ttl()).ok()?;
        let now = Utc::now();

        let mut expired = Vec::new();
        let mut matched: Option<String> = None;
        for (key, entry) in inner.entries.iter() {
            if now - entry.created_at > ttl {
                expired.push(key.clone());
                continue;
            }
            let dist = euclidean_distance(&embedding, &entry.embedding);
            if dist < self.config.epsilon {
                debug!(distance = dist, key = %key, "Semantic cache hit");
                matched = Some(key.clone());
                break;
            }
        }

        for key in expired {
            inner.entries.pop(&key);
        }

        match matched {
            Some(key) => {
                inner.hits += 1;
                // Promote the entry so LRU eviction spares recent hits
                let entry = inner.entries.get(&key)?;
                let mut response = entry.response.clone();
                response.cached = true;
                Some(response)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a response keyed by the request's embedding
    ///
    /// A request with no resolvable embedding is silently not cached.
    pub async fn put(&self, request: &LlmRequest, response: &LlmResponse) {
        if !self.config.enabled {
            return;
        }
        let Some(embedding) = self.resolve_embedding(request).await else {
            return;
        };

        let key = embedding_key(&embedding);
        let entry = CacheEntry {
            response: response.clone(),
            embedding,
            created_at: Utc::now(),
        };

        let mut inner = self.inner.lock();
        // Capacity bound is enforced by the LRU structure itself
        inner.entries.push(key, entry);
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_ratio: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
        info!("Cleared all cache entries");
    }

    /// Embedding attached to the request, or computed via the embedder
    async fn resolve_embedding(&self, request: &LlmRequest) -> Option<Vec<f32>> {
        if let Some(embedding) = &request.embedding {
            return Some(embedding.clone());
        }
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(&request.prompt).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Failed to generate embedding for cache lookup: {}", e);
                None
            }
        }
    }

    /// Rewind every entry's insertion time, for expiry tests
    #[cfg(test)]
    pub(super) fn backdate(&self, age: chrono::Duration) {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner.entries.iter().map(|(k, _)| k.clone()).collect();
        for key in keys {
            if let Some(entry) = inner.entries.peek_mut(&key) {
                entry.created_at -= age;
            }
        }
    }
}

/// Stable key derived from the embedding bytes
fn embedding_key(embedding: &[f32]) -> String {
    let mut hasher = Sha256::new();
    for value in embedding {
        hasher.update(value.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())[..16].to_string()
}

/// Euclidean distance; dimension mismatches never match
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod distance_tests {
    use super::{embedding_key, euclidean_distance};

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(euclidean_distance(&[1.0], &[1.0, 0.0]), f32::INFINITY);
    }

    #[test]
    fn test_embedding_key_is_stable() {
        let a = embedding_key(&[0.1, 0.2, 0.3]);
        let b = embedding_key(&[0.1, 0.2, 0.3]);
        let c = embedding_key(&[0.1, 0.2, 0.4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }
}
