//! # Cache Backend Adapter
//!
//! Thin contract over a remote key-value store. Everything the governance
//! layer does to the cache goes through [`CacheBackend`].
//!
//! ## Design Decisions
//!
//! - **SCAN only**: keys are enumerated with a cursor and a bounded page size,
//!   never with a blocking full-keyspace listing
//! - **Idempotent mutations**: setting a TTL on, or deleting, a key that is
//!   already gone reports `false` rather than an error
//! - **Classified errors**: [`BackendError::is_transient`] separates backend
//!   health problems from programming errors

pub mod memory;
pub mod protected;

#[cfg(feature = "redis-backend")]
pub mod redis;

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryBackend;
pub use protected::ProtectedBackend;

#[cfg(feature = "redis-backend")]
pub use self::redis::RedisBackend;

/// Errors that can occur while talking to the cache backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Failed to reach the backend
    #[error("Backend connection error: {0}")]
    Connection(String),

    /// Backend did not answer in time
    #[error("Backend operation timed out: {0}")]
    Timeout(String),

    /// Backend refused or failed to serve the resource
    #[error("Backend resource access error: {0}")]
    ResourceAccess(String),

    /// Backend replied with something we could not interpret
    #[error("Backend protocol error: {0}")]
    Protocol(String),

    /// Caller passed an argument the backend cannot accept
    #[error("Invalid backend argument: {0}")]
    InvalidArgument(String),
}

impl BackendError {
    /// Connection failures, timeouts and resource-access failures describe the
    /// health of the backend. Protocol and argument errors do not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Connection(_) | BackendError::Timeout(_) | BackendError::ResourceAccess(_)
        )
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// One page of a cursor-based key scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next page; `0` means the scan is complete
    pub cursor: u64,
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Operations the governance layer needs from a cache backend
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Return one page of keys matching `pattern`, starting at `cursor`
    async fn scan(&self, cursor: u64, pattern: &str, page_size: usize) -> BackendResult<ScanPage>;

    /// Read a value; `Ok(None)` on a miss
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Write a value with an expiration
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<()>;

    /// Remaining time-to-live; `None` when the key is absent or never expires
    async fn get_ttl(&self, key: &str) -> BackendResult<Option<Duration>>;

    /// Replace a key's time-to-live. Returns `false` if the key no longer exists.
    async fn set_ttl(&self, key: &str, ttl: Duration) -> BackendResult<bool>;

    /// Delete a key. Returns `false` if the key was already gone.
    async fn delete(&self, key: &str) -> BackendResult<bool>;

    async fn exists(&self, key: &str) -> BackendResult<bool>;

    /// Server-side memory usage in bytes
    async fn server_memory_info(&self) -> BackendResult<u64>;

    fn backend_name(&self) -> &'static str;
}

/// Walk a full cursor scan page by page, de-duplicating keys.
///
/// Backends are allowed to return a key more than once across pages, so the
/// result is collected through a set while preserving first-seen order.
pub async fn scan_all(
    backend: &dyn CacheBackend,
    pattern: &str,
    page_size: usize,
) -> BackendResult<Vec<String>> {
    let page_size = page_size.max(1);
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    let mut cursor = 0;

    loop {
        let page = backend.scan(cursor, pattern, page_size).await?;
        for key in page.keys {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        if page.cursor == 0 {
            break;
        }
        cursor = page.cursor;
    }

    Ok(keys)
}

/// Glob matching with Redis `MATCH` semantics for `*` and `?`
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_k = 0;

    while k < key.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
            p += 1;
            k += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_k = k;
            p += 1;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            star_k += 1;
            k = star_k;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*", ""));
        assert!(glob_match("scheme::*", "scheme::42"));
        assert!(!glob_match("scheme::*", "portfolio::42"));
        assert!(glob_match("item?", "item1"));
        assert!(!glob_match("item?", "item10"));
        assert!(glob_match("*::*", "transactionCache::SimpleKey [1]"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Connection("refused".into()).is_transient());
        assert!(BackendError::Timeout("slow".into()).is_transient());
        assert!(BackendError::ResourceAccess("oom".into()).is_transient());
        assert!(!BackendError::Protocol("bad".into()).is_transient());
        assert!(!BackendError::InvalidArgument("ttl".into()).is_transient());
    }

    #[tokio::test]
    async fn test_scan_all_walks_every_page() {
        let backend = InMemoryBackend::new();
        for i in 0..250 {
            backend
                .set(&format!("key:{i}"), "v", Duration::from_secs(60))
                .await
                .unwrap();
        }

        let keys = scan_all(&backend, "*", 100).await.unwrap();
        assert_eq!(keys.len(), 250);

        let keys = scan_all(&backend, "key:1*", 7).await.unwrap();
        // key:1, key:10..19, key:100..199
        assert_eq!(keys.len(), 111);
    }
}
