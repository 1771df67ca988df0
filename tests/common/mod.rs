#![allow(dead_code)]

pub mod recording_backend;
pub mod scripted_source;
pub mod strategies;

pub use recording_backend::*;
pub use scripted_source::*;

use cache_governor::backend::{CacheBackend, ProtectedBackend};
use cache_governor::controller::AdaptiveStrategyController;
use cache_governor::governor::CacheGovernor;
use cache_governor::monitor::{AccessCounts, InMemoryMeterRegistry, KeyTagMapper, SnapshotSource};
use cache_governor::policy::{Evaluator, PolicyRegistry};
use cache_governor::resilience::{CircuitBreaker, CircuitBreakerConfig};
use std::sync::Arc;
use std::time::Duration;

/// Breaker that opens quickly and recovers after `wait`
pub fn fast_breaker(wait: Duration) -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new(
        "test_cache".to_string(),
        CircuitBreakerConfig {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            minimum_number_of_calls: 4,
            wait_duration_in_open_state: wait,
            permitted_calls_in_half_open_state: 2,
        },
    ))
}

/// Controller over `backend` fed by `source`, with default thresholds and policies
pub fn controller_for(
    source: Arc<dyn SnapshotSource>,
    backend: Arc<dyn CacheBackend>,
    registry: Arc<InMemoryMeterRegistry>,
    stability_threshold: u32,
) -> AdaptiveStrategyController {
    let protected = ProtectedBackend::new(backend, fast_breaker(Duration::from_secs(30)));
    let access = AccessCounts::new(registry, Arc::new(KeyTagMapper::default()));
    let governor = Arc::new(CacheGovernor::new(Arc::new(protected), access));
    AdaptiveStrategyController::new(
        source,
        Evaluator::default(),
        PolicyRegistry::default(),
        governor,
        stability_threshold,
    )
}
