//! # Governed Cache
//!
//! Read/write surface for callers. Every operation goes through the circuit
//! breaker, feeds the metrics monitor and writes with the TTL of whatever
//! policy the governor currently has active.
//!
//! Entries live under a namespace: key `k` of cache `schemeSearchCache` is
//! stored as `schemeSearchCache::k`. A bounded in-process map mirrors recent
//! values and serves reads while the backend is unavailable.

use crate::backend::{scan_all, CacheBackend, ProtectedBackend};
use crate::error::GovernorResult;
use crate::governor::CacheGovernor;
use crate::monitor::CacheMonitor;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const NAMESPACE_SEPARATOR: &str = "::";

#[derive(Debug)]
pub struct GovernedCache {
    name: String,
    backend: ProtectedBackend,
    monitor: CacheMonitor,
    governor: Arc<CacheGovernor>,
    default_ttl: Duration,
    local: DashMap<String, String>,
    local_capacity: usize,
}

impl GovernedCache {
    pub fn new(
        name: impl Into<String>,
        backend: ProtectedBackend,
        monitor: CacheMonitor,
        governor: Arc<CacheGovernor>,
        default_ttl: Duration,
        local_capacity: usize,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            monitor,
            governor,
            default_ttl,
            local: DashMap::new(),
            local_capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend key for a caller key
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{NAMESPACE_SEPARATOR}{key}", self.name)
    }

    /// TTL applied to writes: the active policy's, else the configured default
    pub fn write_ttl(&self) -> Duration {
        self.governor
            .active_expiration()
            .unwrap_or(self.default_ttl)
    }

    fn remember_locally(&self, key: &str, value: &str) {
        if self.local.contains_key(key) || self.local.len() < self.local_capacity {
            self.local.insert(key.to_string(), value.to_string());
        }
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let full_key = self.full_key(key);
        let inner = self.backend.inner();

        match self
            .backend
            .breaker()
            .execute_optional(|| inner.get(&full_key))
            .await
        {
            Some(found) => {
                self.monitor.record_access(&full_key);
                match found {
                    Some(value) => {
                        self.monitor.record_hit(&full_key);
                        self.remember_locally(key, &value);
                        Some(value)
                    }
                    None => {
                        self.monitor.record_miss(&full_key);
                        None
                    }
                }
            }
            None => {
                let value = self.local.get(key).map(|v| v.value().clone());
                debug!(
                    cache = %self.name,
                    key = %key,
                    found = value.is_some(),
                    "Backend unavailable, served from local fallback"
                );
                value
            }
        }
    }

    /// Write a value. Returns whether the backend accepted it; the local
    /// fallback copy is kept either way while capacity allows.
    pub async fn put(&self, key: &str, value: &str) -> bool {
        let full_key = self.full_key(key);
        let ttl = self.write_ttl();
        let inner = self.backend.inner();

        let stored = self
            .backend
            .breaker()
            .execute_optional(|| inner.set(&full_key, value, ttl))
            .await
            .is_some();

        if stored {
            self.monitor.record_update(&full_key);
        } else {
            warn!(cache = %self.name, key = %key, "Failed to write to backend, kept local copy only");
        }
        self.remember_locally(key, value);

        stored
    }

    /// Remove a key from the backend and the local fallback. Returns whether
    /// the backend held it.
    pub async fn evict(&self, key: &str) -> bool {
        let full_key = self.full_key(key);
        let inner = self.backend.inner();

        let removed = self
            .backend
            .breaker()
            .execute_optional(|| inner.delete(&full_key))
            .await;
        self.local.remove(key);

        match removed {
            Some(true) => debug!(cache = %self.name, key = %key, "Evicted key"),
            Some(false) => {
                debug!(cache = %self.name, key = %key, "Key already absent from backend")
            }
            None => warn!(
                cache = %self.name,
                key = %key,
                "Failed to evict from backend, removed local copy only"
            ),
        }

        removed.unwrap_or(false)
    }

    /// Remove every entry of this cache's namespace
    pub async fn clear(&self) -> GovernorResult<u64> {
        let pattern = format!("{}{NAMESPACE_SEPARATOR}*", self.name);
        let keys = scan_all(&self.backend, &pattern, 100).await?;

        let mut removed = 0;
        for key in &keys {
            if self.backend.delete(key).await? {
                removed += 1;
            }
        }
        self.local.clear();

        info!(cache = %self.name, removed = removed, "Cache cleared");
        Ok(removed)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> GovernorResult<Option<T>> {
        match self.get(key).await {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> GovernorResult<bool> {
        let raw = serde_json::to_string(value)?;
        Ok(self.put(key, &raw).await)
    }
}
