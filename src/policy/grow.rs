//! Grow policy: keep entries longer and warm a fixed set of keys.

use super::{PolicyOutcome, ALL_KEYS};
use crate::backend::{scan_all, CacheBackend};
use crate::error::GovernorResult;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct GrowPolicy {
    expiration: Duration,
    preload_keys: Vec<String>,
    batch_size: usize,
}

impl GrowPolicy {
    pub fn new(expiration: Duration, preload_keys: Vec<String>, batch_size: usize) -> Self {
        Self {
            expiration,
            preload_keys,
            batch_size: batch_size.max(1),
        }
    }

    pub fn expiration_time(&self) -> Duration {
        self.expiration
    }

    /// Extend every key's TTL to the nominal expiration, then preload the
    /// warm keys that are missing. An empty cache is left untouched.
    pub async fn apply(&self, backend: &dyn CacheBackend) -> GovernorResult<PolicyOutcome> {
        let keys = scan_all(backend, ALL_KEYS, self.batch_size).await?;
        if keys.is_empty() {
            info!("Cache is empty, nothing to grow");
            return Ok(PolicyOutcome::default());
        }

        let mut outcome = PolicyOutcome {
            keys_scanned: keys.len() as u64,
            ..Default::default()
        };

        for chunk in keys.chunks(self.batch_size) {
            let results = join_all(chunk.iter().map(|key| backend.set_ttl(key, self.expiration))).await;
            for extended in results {
                if extended? {
                    outcome.ttl_adjusted += 1;
                }
            }
        }

        for key in &self.preload_keys {
            if backend.exists(key).await? {
                continue;
            }
            backend
                .set(key, &format!("PreloadedValue_{key}"), self.expiration)
                .await?;
            outcome.keys_preloaded += 1;
            debug!(key = %key, "Preloaded key into cache");
        }

        info!(
            extended = outcome.ttl_adjusted,
            preloaded = outcome.keys_preloaded,
            ttl_seconds = self.expiration.as_secs(),
            "Grow policy applied"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    fn policy() -> GrowPolicy {
        GrowPolicy::new(
            Duration::from_secs(7200),
            vec!["item1".to_string(), "item2".to_string()],
            10,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_extends_ttl_and_preloads_missing_keys() {
        let backend = InMemoryBackend::new();
        backend
            .set("a", "1", Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .set("item1", "cached", Duration::from_secs(60))
            .await
            .unwrap();

        let outcome = policy().apply(&backend).await.unwrap();
        assert_eq!(outcome.keys_scanned, 2);
        assert_eq!(outcome.ttl_adjusted, 2);
        assert_eq!(outcome.keys_preloaded, 1);

        assert_eq!(
            backend.get_ttl("a").await.unwrap(),
            Some(Duration::from_secs(7200))
        );
        assert_eq!(backend.get("item1").await.unwrap(), Some("cached".to_string()));
        assert_eq!(
            backend.get("item2").await.unwrap(),
            Some("PreloadedValue_item2".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_cache_is_noop() {
        let backend = InMemoryBackend::new();
        let outcome = policy().apply(&backend).await.unwrap();
        assert_eq!(outcome, PolicyOutcome::default());
        assert!(backend.is_empty());
    }
}
