//! Shrink policy: evict the least valuable fraction of the cache.
//!
//! Keys are ranked least-used first, then soonest-to-expire first. The
//! leading fraction of the ranking is deleted; among the survivors right
//! behind the cutoff, rarely used keys get a shorter TTL so they age out on
//! their own.

use super::{PolicyOutcome, ALL_KEYS};
use crate::backend::{scan_all, CacheBackend};
use crate::error::GovernorResult;
use crate::monitor::AccessCounts;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info};

/// Ranking input for one key, built per application and then discarded
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMetadata {
    pub key: String,
    pub access_count: f64,
    /// `0` for keys without an expiry
    pub remaining_ttl_seconds: u64,
}

/// Sort ascending by `(access_count, remaining_ttl_seconds)`
pub fn rank_for_eviction(metadata: &mut [KeyMetadata]) {
    metadata.sort_by(|a, b| {
        a.access_count
            .total_cmp(&b.access_count)
            .then(a.remaining_ttl_seconds.cmp(&b.remaining_ttl_seconds))
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkPolicy {
    expiration: Duration,
    reduction_fraction: f64,
    protected_prefix: String,
    low_usage_threshold: f64,
    shortened_ttl: Duration,
    adjust_window: usize,
    batch_size: usize,
}

impl ShrinkPolicy {
    pub fn new(
        expiration: Duration,
        reduction_fraction: f64,
        protected_prefix: impl Into<String>,
        low_usage_threshold: f64,
        shortened_ttl: Duration,
        adjust_window: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            expiration,
            reduction_fraction: reduction_fraction.clamp(0.0, 1.0),
            protected_prefix: protected_prefix.into(),
            low_usage_threshold,
            shortened_ttl,
            adjust_window,
            batch_size: batch_size.max(1),
        }
    }

    pub fn expiration_time(&self) -> Duration {
        self.expiration
    }

    /// Keys to delete out of `candidates` eligible ones
    pub fn removal_count(&self, candidates: usize) -> usize {
        ((candidates as f64 * self.reduction_fraction).floor() as usize).min(candidates)
    }

    fn is_protected(&self, key: &str) -> bool {
        !self.protected_prefix.is_empty() && key.starts_with(&self.protected_prefix)
    }

    async fn collect_metadata(
        &self,
        backend: &dyn CacheBackend,
        access: &AccessCounts,
        keys: Vec<String>,
    ) -> GovernorResult<Vec<KeyMetadata>> {
        let mut metadata = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(self.batch_size) {
            let ttls = join_all(chunk.iter().map(|key| backend.get_ttl(key))).await;
            for (key, ttl) in chunk.iter().zip(ttls) {
                metadata.push(KeyMetadata {
                    key: key.clone(),
                    access_count: access.for_key(key),
                    remaining_ttl_seconds: ttl?.map_or(0, |ttl| ttl.as_secs()),
                });
            }
        }

        Ok(metadata)
    }

    pub async fn apply(
        &self,
        backend: &dyn CacheBackend,
        access: &AccessCounts,
    ) -> GovernorResult<PolicyOutcome> {
        let keys = scan_all(backend, ALL_KEYS, self.batch_size).await?;
        if keys.is_empty() {
            info!("Cache is empty, nothing to reduce");
            return Ok(PolicyOutcome::default());
        }

        let mut outcome = PolicyOutcome {
            keys_scanned: keys.len() as u64,
            ..Default::default()
        };

        let candidates: Vec<String> = keys.into_iter().filter(|k| !self.is_protected(k)).collect();
        let mut ranked = self.collect_metadata(backend, access, candidates).await?;
        rank_for_eviction(&mut ranked);

        let cutoff = self.removal_count(ranked.len());
        info!(
            candidates = ranked.len(),
            to_remove = cutoff,
            "Reducing cache size, least used keys first"
        );

        for (batch, chunk) in ranked[..cutoff].chunks(self.batch_size).enumerate() {
            let results = join_all(chunk.iter().map(|m| backend.delete(&m.key))).await;
            for deleted in results {
                // A key that vanished in the meantime is already where we want it
                if deleted? {
                    outcome.keys_deleted += 1;
                }
            }
            debug!(batch = batch, deleted = outcome.keys_deleted, "Eviction batch complete");
        }

        let window_end = cutoff.saturating_add(self.adjust_window).min(ranked.len());
        let low_usage: Vec<&KeyMetadata> = ranked[cutoff..window_end]
            .iter()
            .filter(|m| m.access_count < self.low_usage_threshold)
            .collect();

        for chunk in low_usage.chunks(self.batch_size) {
            let results =
                join_all(chunk.iter().map(|m| backend.set_ttl(&m.key, self.shortened_ttl))).await;
            for shortened in results {
                if shortened? {
                    outcome.ttl_adjusted += 1;
                }
            }
        }

        info!(
            removed = outcome.keys_deleted,
            shortened = outcome.ttl_adjusted,
            "Cache reduction complete"
        );

        Ok(outcome)
    }
}
