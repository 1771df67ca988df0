use async_trait::async_trait;
use cache_governor::backend::{BackendResult, CacheBackend, InMemoryBackend, ScanPage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// One call made against the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Scan { cursor: u64, pattern: String },
    Get(String),
    Set(String),
    GetTtl(String),
    SetTtl(String, Duration),
    Delete(String),
    Exists(String),
    MemoryInfo,
}

/// In-memory backend that journals every call it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<InMemoryBackend>,
    journal: Arc<Mutex<Vec<BackendCall>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let backend = Self::new();
        for key in keys {
            backend.inner.insert_persistent(key, "value");
        }
        backend
    }

    pub fn store(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Every subsequent call fails with a connection error until restored
    pub fn set_outage(&self, down: bool) {
        self.inner.set_available(!down);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Delete(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn ttl_updates(&self) -> Vec<(String, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::SetTtl(key, ttl) => Some((key, ttl)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.journal.lock().push(call);
    }
}

#[async_trait]
impl CacheBackend for RecordingBackend {
    async fn scan(&self, cursor: u64, pattern: &str, page_size: usize) -> BackendResult<ScanPage> {
        self.record(BackendCall::Scan {
            cursor,
            pattern: pattern.to_string(),
        });
        self.inner.scan(cursor, pattern, page_size).await
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.record(BackendCall::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<()> {
        self.record(BackendCall::Set(key.to_string()));
        self.inner.set(key, value, ttl).await
    }

    async fn get_ttl(&self, key: &str) -> BackendResult<Option<Duration>> {
        self.record(BackendCall::GetTtl(key.to_string()));
        self.inner.get_ttl(key).await
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> BackendResult<bool> {
        self.record(BackendCall::SetTtl(key.to_string(), ttl));
        self.inner.set_ttl(key, ttl).await
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        self.record(BackendCall::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        self.record(BackendCall::Exists(key.to_string()));
        self.inner.exists(key).await
    }

    async fn server_memory_info(&self) -> BackendResult<u64> {
        self.record(BackendCall::MemoryInfo);
        self.inner.server_memory_info().await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
