//! Tests for the semantic cache

use super::{Embedder, SemanticCache};
use crate::config::CacheConfig;
use crate::core::models::{LlmRequest, LlmResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

fn cache_config(max_size: usize, epsilon: f32) -> CacheConfig {
    CacheConfig {
        enabled: true,
        max_size,
        epsilon,
        ttl_secs: 86_400,
    }
}

fn response(text: &str) -> LlmResponse {
    LlmResponse {
        text: text.to_string(),
        provider: "stub".to_string(),
        model: "stub-model".to_string(),
        latency_ms: 5.0,
        ttft_ms: None,
        token_usage: Default::default(),
        cost_usd: 0.0,
        cached: false,
        trace_id: "trace".to_string(),
    }
}

struct LengthEmbedder;

#[async_trait]
impl Embedder for LengthEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.len() as f32, 0.0])
    }

    fn dimension(&self) -> usize {
        2
    }
}

#[tokio::test]
async fn test_put_then_get_within_epsilon() {
    let cache = SemanticCache::new(cache_config(10, 0.1), None);

    let request = LlmRequest::new("what is rust").with_embedding(vec![0.0, 0.0]);
    cache.put(&request, &response("a systems language")).await;

    let similar = LlmRequest::new("what's rust?").with_embedding(vec![0.05, 0.05]);
    let hit = cache.get(&similar).await.unwrap();
    assert!(hit.cached);
    assert_eq!(hit.text, "a systems language");
}

#[tokio::test]
async fn test_no_entry_within_epsilon_misses() {
    let cache = SemanticCache::new(cache_config(10, 0.1), None);

    let request = LlmRequest::new("a").with_embedding(vec![0.0, 0.0]);
    cache.put(&request, &response("answer")).await;

    let distant = LlmRequest::new("b").with_embedding(vec![1.0, 1.0]);
    assert!(cache.get(&distant).await.is_none());

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 0);
}

#[tokio::test]
async fn test_requests_without_embedding_never_cached() {
    let cache = SemanticCache::new(cache_config(10, 0.1), None);

    let request = LlmRequest::new("no embedding here");
    cache.put(&request, &response("ignored")).await;
    assert_eq!(cache.stats().size, 0);
    assert!(cache.get(&request).await.is_none());
}

#[tokio::test]
async fn test_embedder_used_when_no_attached_embedding() {
    let cache = SemanticCache::new(cache_config(10, 0.5), Some(Arc::new(LengthEmbedder)));

    let request = LlmRequest::new("12345");
    cache.put(&request, &response("five")).await;

    // Same length, same embedding under the stub embedder
    let similar = LlmRequest::new("abcde");
    let hit = cache.get(&similar).await.unwrap();
    assert_eq!(hit.text, "five");
    assert!(hit.cached);
}

#[tokio::test]
async fn test_expired_entries_skipped() {
    let cache = SemanticCache::new(cache_config(10, 0.1), None);

    let request = LlmRequest::new("old").with_embedding(vec![0.0, 0.0]);
    cache.put(&request, &response("stale")).await;

    // Push the entry past the 24h lifetime
    cache.backdate(chrono::Duration::hours(25));
    assert!(cache.get(&request).await.is_none());
    // Expired entry was evicted during the lookup
    assert_eq!(cache.stats().size, 0);
}

#[tokio::test]
async fn test_lru_eviction_beyond_capacity() {
    let cache = SemanticCache::new(cache_config(2, 0.1), None);

    for (i, text) in ["first", "second", "third"].iter().enumerate() {
        let embedding = vec![i as f32 * 10.0, 0.0];
        let request = LlmRequest::new(*text).with_embedding(embedding);
        cache.put(&request, &response(text)).await;
    }
    assert_eq!(cache.stats().size, 2);

    // Oldest entry is gone; the two newest survive
    let first = LlmRequest::new("first").with_embedding(vec![0.0, 0.0]);
    assert!(cache.get(&first).await.is_none());

    let third = LlmRequest::new("third").with_embedding(vec![20.0, 0.0]);
    assert!(cache.get(&third).await.is_some());
}

#[tokio::test]
async fn test_disabled_cache_is_inert() {
    let config = CacheConfig {
        enabled: false,
        ..cache_config(10, 0.1)
    };
    let cache = SemanticCache::new(config, None);

    let request = LlmRequest::new("x").with_embedding(vec![0.0, 0.0]);
    cache.put(&request, &response("y")).await;
    assert!(cache.get(&request).await.is_none());
    assert_eq!(cache.stats().size, 0);
}

#[tokio::test]
async fn test_stats_hit_ratio() {
    let cache = SemanticCache::new(cache_config(10, 0.1), None);

    let request = LlmRequest::new("q").with_embedding(vec![0.0, 0.0]);
    cache.put(&request, &response("a")).await;

    cache.get(&request).await;
    let distant = LlmRequest::new("far").with_embedding(vec![9.0, 9.0]);
    cache.get(&distant).await;

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_ratio - 0.5).abs() < 1e-9);

    cache.clear();
    assert_eq!(cache.stats().size, 0);
    assert_eq!(cache.stats().hits, 0);
}
