//! Type definitions for semantic caching

use crate::core::models::LlmResponse;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One cached response and the embedding that keyed it
///
/// Entries are immutable after insertion; they disappear through expiry or
/// LRU eviction.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Response captured on the original cache miss
    pub response: LlmResponse,
    /// Embedding of the originating prompt
    pub embedding: Vec<f32>,
    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    /// Entries currently held
    pub size: usize,
    /// Lookups served from cache
    pub hits: u64,
    /// Lookups that found no entry within the radius
    pub misses: u64,
    /// hits / (hits + misses)
    pub hit_ratio: f64,
}

/// Embedding function injected into the cache
///
/// Must be deterministic for a given text; only used for cache keys.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce a fixed-length vector for the text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output vector length
    fn dimension(&self) -> usize;
}
