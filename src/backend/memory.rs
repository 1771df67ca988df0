//! In-process cache backend
//!
//! Implements the full [`CacheBackend`] contract on top of a `DashMap`, with
//! per-key expiry evaluated lazily on access. Useful for local development,
//! single-instance deployments and tests.
//!
//! The backend can be switched into a simulated outage with
//! [`InMemoryBackend::set_available`], in which every call fails with a
//! connection error.

use super::{glob_match, BackendError, BackendResult, CacheBackend, ScanPage};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Fixed per-entry overhead used by the memory estimate
const ENTRY_OVERHEAD_BYTES: u64 = 64;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Concurrent in-memory cache backend with TTL support
#[derive(Debug)]
pub struct InMemoryBackend {
    entries: DashMap<String, Entry>,
    available: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle a simulated outage
    pub fn set_available(&self, available: bool) {
        debug!(available = available, "In-memory backend availability changed");
        self.available.store(available, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Insert a key that never expires
    pub fn insert_persistent(&self, key: &str, value: &str) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self, operation: &str) -> BackendResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BackendError::Connection(format!(
                "in-memory backend unavailable during {operation}"
            )))
        }
    }

    /// Fetch a live entry, dropping it if it has expired
    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.entries.get(key).map(|e| e.value().clone())?;
        if entry.is_live(now) {
            Some(entry)
        } else {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
            None
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn scan(&self, cursor: u64, pattern: &str, page_size: usize) -> BackendResult<ScanPage> {
        self.ensure_available("SCAN")?;
        if page_size == 0 {
            return Err(BackendError::InvalidArgument(
                "scan page size must be greater than 0".to_string(),
            ));
        }

        let now = Instant::now();
        let mut matching: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.is_live(now) && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect();
        matching.sort_unstable();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(matching.len());
        let end = start.saturating_add(page_size).min(matching.len());
        let next_cursor = if end >= matching.len() { 0 } else { end as u64 };

        Ok(ScanPage {
            cursor: next_cursor,
            keys: matching[start..end].to_vec(),
        })
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.ensure_available("GET")?;
        Ok(self.live_entry(key).map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<()> {
        self.ensure_available("SET")?;
        if ttl.is_zero() {
            return Err(BackendError::InvalidArgument(format!(
                "ttl for key {key} must be greater than 0"
            )));
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get_ttl(&self, key: &str) -> BackendResult<Option<Duration>> {
        self.ensure_available("PTTL")?;
        let now = Instant::now();
        Ok(self
            .live_entry(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> BackendResult<bool> {
        self.ensure_available("PEXPIRE")?;
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        self.ensure_available("DEL")?;
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        self.ensure_available("EXISTS")?;
        Ok(self.live_entry(key).is_some())
    }

    async fn server_memory_info(&self) -> BackendResult<u64> {
        self.ensure_available("INFO memory")?;
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|e| e.is_live(now))
            .map(|e| (e.key().len() + e.value.len()) as u64 + ENTRY_OVERHEAD_BYTES)
            .sum())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
