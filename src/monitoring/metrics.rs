//! Metrics collection and aggregation
//!
//! Named counters and histograms emitted by the router, plus the combined
//! diagnostic snapshot consumable by any metrics backend.

use crate::core::semantic_cache::CacheStats;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Running summary of a latency-style distribution
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistogramSummary {
    /// Samples recorded
    pub count: u64,
    /// Sum of all samples
    pub sum: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl HistogramSummary {
    fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// Arithmetic mean of the recorded samples
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Snapshot of the router's named counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CounterSnapshot {
    /// `requests.total`
    pub requests_total: u64,
    /// `requests.success`
    pub requests_success: u64,
    /// `requests.error`
    pub requests_error: u64,
    /// `cache.hits`
    pub cache_hits: u64,
    /// `cache.misses`
    pub cache_misses: u64,
    /// `tokens.total`
    pub tokens_total: u64,
    /// `cost.usd`
    pub cost_usd: f64,
}

#[derive(Debug, Default)]
struct MetricsStorage {
    counters: CounterSnapshot,
    latency_ms: HistogramSummary,
    ttft_ms: HistogramSummary,
}

/// Collector behind the router's observability sink
#[derive(Debug, Default)]
pub struct MetricsCollector {
    storage: Mutex<MetricsStorage>,
}

impl MetricsCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed call
    pub fn record_success(&self, latency_ms: f64, ttft_ms: Option<f64>, tokens: u64, cost: f64) {
        let mut storage = self.storage.lock();
        storage.counters.requests_total += 1;
        storage.counters.requests_success += 1;
        storage.counters.tokens_total += tokens;
        storage.counters.cost_usd += cost;
        storage.latency_ms.record(latency_ms);
        if let Some(ttft) = ttft_ms {
            storage.ttft_ms.record(ttft);
        }
    }

    /// Record a failed call
    pub fn record_error(&self) {
        let mut storage = self.storage.lock();
        storage.counters.requests_total += 1;
        storage.counters.requests_error += 1;
    }

    /// Record a cache hit
    pub fn record_cache_hit(&self) {
        self.storage.lock().counters.cache_hits += 1;
    }

    /// Record a cache miss
    pub fn record_cache_miss(&self) {
        self.storage.lock().counters.cache_misses += 1;
    }

    /// Copy out the current counters and histograms
    pub fn snapshot(&self) -> (CounterSnapshot, HistogramSummary, HistogramSummary) {
        let storage = self.storage.lock();
        (
            storage.counters.clone(),
            storage.latency_ms.clone(),
            storage.ttft_ms.clone(),
        )
    }
}

/// Per-provider slice of the diagnostic snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetrics {
    /// Whether the provider is currently considered usable
    pub healthy: bool,
    /// Calls routed to this provider
    pub total_requests: u64,
    /// Calls that ended in failure
    pub total_errors: u64,
    /// Exponential moving average latency
    pub avg_latency_ms: f64,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

/// Combined diagnostic snapshot returned by `Router::get_metrics`
#[derive(Debug, Clone, Serialize)]
pub struct RouterMetrics {
    /// Per-provider health and usage
    pub providers: HashMap<String, ProviderMetrics>,
    /// Cache statistics
    pub cache: CacheStats,
    /// Named counters
    pub counters: CounterSnapshot,
    /// `latency.ms` histogram
    pub latency_ms: HistogramSummary,
    /// `ttft.ms` histogram
    pub ttft_ms: HistogramSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_updates_counters_and_histograms() {
        let collector = MetricsCollector::new();
        collector.record_success(120.0, Some(30.0), 500, 0.012);
        collector.record_success(80.0, None, 200, 0.004);
        collector.record_error();

        let (counters, latency, ttft) = collector.snapshot();
        assert_eq!(counters.requests_total, 3);
        assert_eq!(counters.requests_success, 2);
        assert_eq!(counters.requests_error, 1);
        assert_eq!(counters.tokens_total, 700);
        assert!((counters.cost_usd - 0.016).abs() < 1e-9);

        assert_eq!(latency.count, 2);
        assert_eq!(latency.min, 80.0);
        assert_eq!(latency.max, 120.0);
        assert_eq!(latency.mean(), 100.0);
        assert_eq!(ttft.count, 1);
    }

    #[test]
    fn test_cache_counters() {
        let collector = MetricsCollector::new();
        collector.record_cache_hit();
        collector.record_cache_miss();
        collector.record_cache_miss();

        let (counters, _, _) = collector.snapshot();
        assert_eq!(counters.cache_hits, 1);
        assert_eq!(counters.cache_misses, 2);
    }
}
