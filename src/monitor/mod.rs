//! # Metrics Monitor
//!
//! Aggregates cache access, update, hit and miss counters and derives the
//! [`MetricsSnapshot`] the adaptive controller decides on.
//!
//! Snapshots never fail because the backend is unreachable: scan and memory
//! introspection failures are logged and reported as zeroes, so a tick can
//! still run against a degraded view.

pub mod key_tags;
pub mod registry;

use crate::backend::{CacheBackend, ProtectedBackend};
use crate::constants::metrics;
use crate::error::GovernorResult;
use crate::resilience::CircuitState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use key_tags::KeyTagMapper;
pub use registry::{InMemoryMeterRegistry, MetricsRegistry};

/// Point-in-time view of cache health
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub key_count: u64,
    /// Hits over hits plus misses, in `[0, 1]`
    pub hit_rate: f64,
    pub memory_usage_bytes: u64,
    pub backend_state: CircuitState,
}

/// Anything that can produce a snapshot for the controller
#[async_trait]
pub trait SnapshotSource: Send + Sync + std::fmt::Debug {
    async fn snapshot(&self) -> GovernorResult<MetricsSnapshot>;
}

/// Hit rate from raw counts; `0.0` when there was no traffic
pub fn hit_rate(hits: f64, misses: f64) -> f64 {
    let total = hits + misses;
    if total <= 0.0 {
        0.0
    } else {
        (hits / total).clamp(0.0, 1.0)
    }
}

/// Per-key access counts, resolved through the same tag mapping the monitor
/// records with
#[derive(Debug, Clone)]
pub struct AccessCounts {
    registry: Arc<dyn MetricsRegistry>,
    tags: Arc<KeyTagMapper>,
}

impl AccessCounts {
    pub fn new(registry: Arc<dyn MetricsRegistry>, tags: Arc<KeyTagMapper>) -> Self {
        Self { registry, tags }
    }

    pub fn for_key(&self, key: &str) -> f64 {
        self.registry
            .count(metrics::CACHE_ACCESS, self.tags.tag_for(key))
    }
}

#[derive(Debug, Clone)]
pub struct CacheMonitor {
    registry: Arc<dyn MetricsRegistry>,
    tags: Arc<KeyTagMapper>,
    backend: ProtectedBackend,
    scan_pattern: String,
    scan_page_size: usize,
}

impl CacheMonitor {
    pub fn new(
        registry: Arc<dyn MetricsRegistry>,
        tags: KeyTagMapper,
        backend: ProtectedBackend,
        scan_pattern: impl Into<String>,
        scan_page_size: usize,
    ) -> Self {
        Self {
            registry,
            tags: Arc::new(tags),
            backend,
            scan_pattern: scan_pattern.into(),
            scan_page_size: scan_page_size.max(1),
        }
    }

    pub fn record_access(&self, key: &str) {
        self.record(metrics::CACHE_ACCESS, key);
    }

    pub fn record_update(&self, key: &str) {
        self.record(metrics::CACHE_UPDATE, key);
    }

    pub fn record_hit(&self, key: &str) {
        self.record(metrics::CACHE_HIT, key);
    }

    pub fn record_miss(&self, key: &str) {
        self.record(metrics::CACHE_MISS, key);
    }

    fn record(&self, counter: &str, key: &str) {
        self.registry.increment(counter, self.tags.tag_for(key));
    }

    pub fn access_counts(&self) -> AccessCounts {
        AccessCounts::new(self.registry.clone(), self.tags.clone())
    }

    /// Hit rate across every tag
    pub fn hit_rate(&self) -> f64 {
        hit_rate(
            self.registry.total(metrics::CACHE_HIT),
            self.registry.total(metrics::CACHE_MISS),
        )
    }

    /// Count keys page by page without holding the whole key set
    async fn count_keys(&self) -> u64 {
        let mut count = 0u64;
        let mut cursor = 0;

        loop {
            match self
                .backend
                .scan(cursor, &self.scan_pattern, self.scan_page_size)
                .await
            {
                Ok(page) => {
                    count += page.keys.len() as u64;
                    if page.is_last() {
                        break;
                    }
                    cursor = page.cursor;
                }
                Err(e) => {
                    warn!(error = %e, counted = count, "Key scan failed, reporting partial count");
                    break;
                }
            }
        }

        count
    }

    async fn memory_usage(&self) -> u64 {
        self.backend
            .server_memory_info()
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Memory introspection failed, reporting 0");
                0
            })
    }
}

#[async_trait]
impl SnapshotSource for CacheMonitor {
    async fn snapshot(&self) -> GovernorResult<MetricsSnapshot> {
        let key_count = self.count_keys().await;
        let memory_usage_bytes = self.memory_usage().await;
        let snapshot = MetricsSnapshot {
            key_count,
            hit_rate: self.hit_rate(),
            memory_usage_bytes,
            backend_state: self.backend.circuit_state(),
        };

        debug!(
            key_count = snapshot.key_count,
            hit_rate = snapshot.hit_rate,
            memory_usage_bytes = snapshot.memory_usage_bytes,
            backend_state = %snapshot.backend_state,
            "Captured cache metrics snapshot"
        );

        Ok(snapshot)
    }
}
