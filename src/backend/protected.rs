//! # Protected Backend
//!
//! [`CacheBackend`] decorator that routes every call through a shared
//! [`CircuitBreaker`]. Failures and open-circuit short-circuits resolve to a
//! neutral value instead of an error, so policies and the monitor degrade
//! quietly while the remote cache is unavailable.

use super::{BackendResult, CacheBackend, ScanPage};
use crate::resilience::{CircuitBreaker, CircuitState};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProtectedBackend {
    inner: Arc<dyn CacheBackend>,
    breaker: Arc<CircuitBreaker>,
}

impl ProtectedBackend {
    pub fn new(inner: Arc<dyn CacheBackend>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    /// Unprotected backend, for callers that must tell a miss from an outage
    pub fn inner(&self) -> &Arc<dyn CacheBackend> {
        &self.inner
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}

#[async_trait]
impl CacheBackend for ProtectedBackend {
    async fn scan(&self, cursor: u64, pattern: &str, page_size: usize) -> BackendResult<ScanPage> {
        Ok(self
            .breaker
            .execute(
                || self.inner.scan(cursor, pattern, page_size),
                ScanPage::default,
            )
            .await)
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.breaker.execute(|| self.inner.get(key), || None).await)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<()> {
        self.breaker
            .execute(|| self.inner.set(key, value, ttl), || ())
            .await;
        Ok(())
    }

    async fn get_ttl(&self, key: &str) -> BackendResult<Option<Duration>> {
        Ok(self
            .breaker
            .execute(|| self.inner.get_ttl(key), || None)
            .await)
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> BackendResult<bool> {
        Ok(self
            .breaker
            .execute(|| self.inner.set_ttl(key, ttl), || false)
            .await)
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        Ok(self
            .breaker
            .execute(|| self.inner.delete(key), || false)
            .await)
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        Ok(self
            .breaker
            .execute(|| self.inner.exists(key), || false)
            .await)
    }

    async fn server_memory_info(&self) -> BackendResult<u64> {
        Ok(self
            .breaker
            .execute(|| self.inner.server_memory_info(), || 0)
            .await)
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{scan_all, InMemoryBackend};
    use crate::resilience::CircuitBreakerConfig;

    fn protected(memory: Arc<InMemoryBackend>) -> ProtectedBackend {
        let config = CircuitBreakerConfig {
            sliding_window_size: 4,
            minimum_number_of_calls: 2,
            wait_duration_in_open_state: Duration::from_secs(60),
            ..Default::default()
        };
        ProtectedBackend::new(
            memory,
            Arc::new(CircuitBreaker::new("cache".to_string(), config)),
        )
    }

    #[tokio::test]
    async fn test_passes_through_when_healthy() {
        let memory = Arc::new(InMemoryBackend::new());
        let backend = protected(memory.clone());

        backend
            .set("a", "1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("a").await.unwrap(), Some("1".to_string()));
        assert!(backend.exists("a").await.unwrap());
        assert!(backend.delete("a").await.unwrap());
        assert_eq!(memory.len(), 0);
        assert_eq!(backend.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_outage_resolves_to_neutral_values_and_opens() {
        let memory = Arc::new(InMemoryBackend::new());
        memory.insert_persistent("a", "1");
        let backend = protected(memory.clone());
        memory.set_available(false);

        assert_eq!(backend.get("a").await.unwrap(), None);
        assert!(!backend.exists("a").await.unwrap());
        assert_eq!(backend.server_memory_info().await.unwrap(), 0);
        assert_eq!(backend.circuit_state(), CircuitState::Open);

        // Open circuit: nothing reaches the backend, even once it recovers
        memory.set_available(true);
        assert!(scan_all(&backend, "*", 10).await.unwrap().is_empty());
        assert!(!backend.delete("a").await.unwrap());
        assert!(memory.exists("a").await.unwrap());
    }
}
