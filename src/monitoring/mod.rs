//! Observability: metrics collection, health probing, tracing setup

pub mod health;
pub mod metrics;

pub use health::{HealthEvent, HealthMonitor};
pub use metrics::{
    CounterSnapshot, HistogramSummary, MetricsCollector, ProviderMetrics, RouterMetrics,
};

use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber honoring `RUST_LOG`
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
