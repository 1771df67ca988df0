//! TTL retuning policy: popular keys live longer, cold keys expire sooner.

use super::{PolicyOutcome, ALL_KEYS};
use crate::backend::{scan_all, CacheBackend};
use crate::error::GovernorResult;
use crate::monitor::AccessCounts;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct RetuneTtlPolicy {
    /// Nominal expiration, also the cap for interpolated TTLs
    expiration: Duration,
    min_ttl: Duration,
    max_ttl: Duration,
    low_band: f64,
    high_band: f64,
    batch_size: usize,
}

impl RetuneTtlPolicy {
    pub fn new(
        expiration: Duration,
        min_ttl: Duration,
        max_ttl: Duration,
        low_band: f64,
        high_band: f64,
        batch_size: usize,
    ) -> Self {
        Self {
            expiration,
            min_ttl,
            max_ttl,
            low_band,
            high_band,
            batch_size: batch_size.max(1),
        }
    }

    /// Nominal expiration, clamped into `[min_ttl, max_ttl]`
    pub fn expiration_time(&self) -> Duration {
        self.expiration.min(self.max_ttl).max(self.min_ttl)
    }

    /// TTL for a key accessed `access_count` times.
    ///
    /// Above the high band a key gets the ceiling, below the low band the
    /// floor. In between the TTL is interpolated linearly from floor to
    /// ceiling and capped at the nominal expiration. A band with no width
    /// sends a key sitting on it to the ceiling.
    pub fn ttl_for_access_count(&self, access_count: f64) -> Duration {
        if access_count > self.high_band {
            return self.max_ttl;
        }
        if access_count < self.low_band || !access_count.is_finite() {
            return self.min_ttl;
        }

        let span = self.high_band - self.low_band;
        if span.is_nan() || span <= 0.0 {
            return self.max_ttl;
        }

        let floor = self.min_ttl.as_secs_f64();
        let ceiling = self.max_ttl.as_secs_f64();
        let interpolated = floor + (access_count - self.low_band) * (ceiling - floor) / span;

        Duration::try_from_secs_f64(interpolated)
            .unwrap_or(self.max_ttl)
            .min(self.expiration)
            .max(self.min_ttl)
    }

    pub async fn apply(
        &self,
        backend: &dyn CacheBackend,
        access: &AccessCounts,
    ) -> GovernorResult<PolicyOutcome> {
        let keys = scan_all(backend, ALL_KEYS, self.batch_size).await?;
        if keys.is_empty() {
            info!("Cache is empty, no TTL adjustments needed");
            return Ok(PolicyOutcome::default());
        }

        let mut outcome = PolicyOutcome {
            keys_scanned: keys.len() as u64,
            ..Default::default()
        };

        for chunk in keys.chunks(self.batch_size) {
            let results = join_all(chunk.iter().map(|key| {
                let ttl = self.ttl_for_access_count(access.for_key(key));
                debug!(key = %key, ttl_seconds = ttl.as_secs(), "Retuning key TTL");
                backend.set_ttl(key, ttl)
            }))
            .await;

            for adjusted in results {
                if adjusted? {
                    outcome.ttl_adjusted += 1;
                }
            }
        }

        info!(adjusted = outcome.ttl_adjusted, "TTL retune applied");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::constants::metrics;
    use crate::monitor::{InMemoryMeterRegistry, KeyTagMapper, MetricsRegistry};
    use std::collections::HashMap;
    use std::sync::Arc;

    const MINUTE: u64 = 60;

    fn policy() -> RetuneTtlPolicy {
        RetuneTtlPolicy::new(
            Duration::from_secs(30 * MINUTE),
            Duration::from_secs(15 * MINUTE),
            Duration::from_secs(120 * MINUTE),
            10.0,
            50.0,
            100,
        )
    }

    #[test]
    fn test_bands_map_to_floor_and_ceiling() {
        let policy = policy();
        assert_eq!(policy.ttl_for_access_count(60.0), Duration::from_secs(120 * MINUTE));
        assert_eq!(policy.ttl_for_access_count(2.0), Duration::from_secs(15 * MINUTE));
        assert_eq!(policy.ttl_for_access_count(f64::NAN), Duration::from_secs(15 * MINUTE));
    }

    #[test]
    fn test_interpolation_is_capped_at_nominal() {
        let policy = policy();
        // 15min + 2 * 105min / 40 = 20.25min
        assert_eq!(policy.ttl_for_access_count(12.0), Duration::from_secs(1215));
        assert_eq!(policy.ttl_for_access_count(10.0), Duration::from_secs(15 * MINUTE));
        assert_eq!(policy.ttl_for_access_count(40.0), Duration::from_secs(30 * MINUTE));
        assert_eq!(policy.ttl_for_access_count(50.0), Duration::from_secs(30 * MINUTE));
    }

    #[test]
    fn test_zero_width_band_does_not_panic() {
        let policy = RetuneTtlPolicy::new(
            Duration::from_secs(30 * MINUTE),
            Duration::from_secs(15 * MINUTE),
            Duration::from_secs(120 * MINUTE),
            10.0,
            10.0,
            100,
        );
        assert_eq!(policy.ttl_for_access_count(10.0), Duration::from_secs(120 * MINUTE));
        assert_eq!(policy.ttl_for_access_count(9.0), Duration::from_secs(15 * MINUTE));
        assert_eq!(policy.ttl_for_access_count(11.0), Duration::from_secs(120 * MINUTE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_sets_ttl_per_key() {
        let backend = InMemoryBackend::new();
        backend.insert_persistent("hot", "1");
        backend.insert_persistent("cold", "1");

        let registry = Arc::new(InMemoryMeterRegistry::new());
        for _ in 0..60 {
            registry.increment(metrics::CACHE_ACCESS, "hot");
        }
        registry.increment(metrics::CACHE_ACCESS, "cold");
        let access = AccessCounts::new(registry, Arc::new(KeyTagMapper::new(HashMap::new(), vec![])));

        let outcome = policy().apply(&backend, &access).await.unwrap();
        assert_eq!(outcome.ttl_adjusted, 2);
        assert_eq!(
            backend.get_ttl("hot").await.unwrap(),
            Some(Duration::from_secs(120 * MINUTE))
        );
        assert_eq!(
            backend.get_ttl("cold").await.unwrap(),
            Some(Duration::from_secs(15 * MINUTE))
        );
    }

    #[tokio::test]
    async fn test_empty_cache_is_noop() {
        let backend = InMemoryBackend::new();
        let registry = Arc::new(InMemoryMeterRegistry::new());
        let access = AccessCounts::new(registry, Arc::new(KeyTagMapper::default()));
        let outcome = policy().apply(&backend, &access).await.unwrap();
        assert_eq!(outcome, PolicyOutcome::default());
    }
}
