//! Counter registry consumed by the monitor and the policies.

use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters keyed by name and a single `key` tag
pub trait MetricsRegistry: Send + Sync + Debug {
    fn increment(&self, name: &str, tag: &str);

    /// Current count for one tag; `0.0` if the counter was never touched
    fn count(&self, name: &str, tag: &str) -> f64;

    /// Sum of a counter across every tag
    fn total(&self, name: &str) -> f64;
}

/// Lock-free in-process registry
#[derive(Debug, Default)]
pub struct InMemoryMeterRegistry {
    counters: DashMap<(String, String), AtomicU64>,
}

impl InMemoryMeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.counters.clear();
    }
}

impl MetricsRegistry for InMemoryMeterRegistry {
    fn increment(&self, name: &str, tag: &str) {
        self.counters
            .entry((name.to_string(), tag.to_string()))
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    fn count(&self, name: &str, tag: &str) -> f64 {
        self.counters
            .get(&(name.to_string(), tag.to_string()))
            .map_or(0.0, |c| c.load(Ordering::Relaxed) as f64)
    }

    fn total(&self, name: &str) -> f64 {
        self.counters
            .iter()
            .filter(|entry| entry.key().0 == name)
            .map(|entry| entry.value().load(Ordering::Relaxed) as f64)
            .sum()
    }
}
