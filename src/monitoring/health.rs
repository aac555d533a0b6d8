//! Out-of-band provider health probing
//!
//! A producer task probes each provider's liveness endpoint on an interval
//! and sends the results over a channel; a dedicated consumer task applies
//! them. Probe results flow exclusively through the channel so no probing
//! thread ever touches shared health state directly.

use crate::core::providers::Provider;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Outcome of probing one provider
#[derive(Debug, Clone)]
pub struct HealthEvent {
    /// Provider that was probed
    pub provider: String,
    /// Whether the liveness endpoint answered with a 2xx
    pub reachable: bool,
    /// When the probe completed
    pub probed_at: DateTime<Utc>,
}

/// Handle to the probe producer/consumer task pair
pub struct HealthMonitor {
    producer: JoinHandle<()>,
    consumer: JoinHandle<()>,
}

impl HealthMonitor {
    /// Spawn the probe loop; `apply` runs on the consumer task for every event
    pub fn spawn<F>(
        providers: Vec<Arc<dyn Provider>>,
        interval: Duration,
        mut apply: F,
    ) -> Self
    where
        F: FnMut(HealthEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<HealthEvent>(EVENT_CHANNEL_CAPACITY);

        let producer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                for provider in &providers {
                    let reachable = provider.health_check().await;
                    debug!(provider = provider.name(), reachable, "Health probe completed");
                    let event = HealthEvent {
                        provider: provider.name().to_string(),
                        reachable,
                        probed_at: Utc::now(),
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        });

        let consumer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                apply(event);
            }
        });

        info!("Health monitor started");
        Self { producer, consumer }
    }

    /// Stop both tasks
    pub fn shutdown(&self) {
        self.producer.abort();
        self.consumer.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{LlmRequest, LlmResponse, RateLimitInfo};
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubProvider {
        name: String,
        alive: AtomicBool,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse> {
            unreachable!("probe tests never complete")
        }

        fn parse_rate_limit_headers(
            &self,
            _headers: &reqwest::header::HeaderMap,
        ) -> RateLimitInfo {
            RateLimitInfo::default()
        }

        fn observed_limits(&self) -> RateLimitInfo {
            RateLimitInfo::default()
        }

        async fn health_check(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_events_flow_through_channel() {
        let provider = Arc::new(StubProvider {
            name: "stub".to_string(),
            alive: AtomicBool::new(true),
        });
        let events: Arc<Mutex<Vec<HealthEvent>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = events.clone();
        let monitor = HealthMonitor::spawn(
            vec![provider.clone()],
            Duration::from_millis(10),
            move |event| sink.lock().push(event),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        monitor.shutdown();

        let seen = events.lock();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|e| e.provider == "stub" && e.reachable));
    }

    #[tokio::test]
    async fn test_unreachable_provider_reported() {
        let provider = Arc::new(StubProvider {
            name: "down".to_string(),
            alive: AtomicBool::new(false),
        });
        let events: Arc<Mutex<Vec<HealthEvent>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = events.clone();
        let monitor =
            HealthMonitor::spawn(vec![provider], Duration::from_millis(10), move |event| {
                sink.lock().push(event)
            });

        tokio::time::sleep(Duration::from_millis(40)).await;
        drop(monitor);

        let seen = events.lock();
        assert!(seen.iter().any(|e| !e.reachable));
    }
}
