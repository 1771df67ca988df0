//! Redis cache backend
//!
//! Uses `redis::aio::ConnectionManager` for async multiplexed connections
//! with automatic reconnection. Requires the `redis-backend` feature flag.

use super::{BackendError, BackendResult, CacheBackend, ScanPage};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Redis-backed implementation of [`CacheBackend`]
#[derive(Clone)]
pub struct RedisBackend {
    connection_manager: redis::aio::ConnectionManager,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connection_manager", &"ConnectionManager")
            .finish()
    }
}

impl RedisBackend {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str) -> BackendResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            BackendError::Connection(format!("Failed to create Redis client: {e}"))
        })?;

        let connection_manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| BackendError::Connection(format!("Failed to connect to Redis: {e}")))?;

        debug!(url = %redact_url(url), "Redis backend connected");

        Ok(Self { connection_manager })
    }
}

/// Map a Redis client error onto the backend taxonomy
fn classify(command: &str, error: redis::RedisError) -> BackendError {
    let message = format!("Redis {command} failed: {error}");
    if error.is_timeout() {
        BackendError::Timeout(message)
    } else if error.is_connection_dropped() || error.is_connection_refusal() || error.is_io_error()
    {
        BackendError::Connection(message)
    } else if error.kind() == redis::ErrorKind::TypeError {
        BackendError::Protocol(message)
    } else {
        BackendError::ResourceAccess(message)
    }
}

/// Extract `used_memory` from an `INFO memory` reply
fn parse_used_memory(info: &str) -> BackendResult<u64> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("used_memory:"))
        .ok_or_else(|| BackendError::Protocol("INFO memory reply lacks used_memory".to_string()))?
        .trim()
        .parse::<u64>()
        .map_err(|e| BackendError::Protocol(format!("Invalid used_memory value: {e}")))
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn scan(&self, cursor: u64, pattern: &str, page_size: usize) -> BackendResult<ScanPage> {
        let mut conn = self.connection_manager.clone();
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(page_size)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("SCAN", e))?;

        Ok(ScanPage {
            cursor: next_cursor,
            keys,
        })
    }

    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("GET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<()> {
        let mut conn = self.connection_manager.clone();
        let ttl_millis = ttl.as_millis().max(1) as u64;

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| classify("SET", e))
    }

    async fn get_ttl(&self, key: &str) -> BackendResult<Option<Duration>> {
        let mut conn = self.connection_manager.clone();
        let millis: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("PTTL", e))?;

        // -2: key missing, -1: no expiry
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> BackendResult<bool> {
        let mut conn = self.connection_manager.clone();
        let ttl_millis = ttl.as_millis().max(1) as u64;

        redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("PEXPIRE", e))
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        let mut conn = self.connection_manager.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("DEL", e))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("EXISTS", e))
    }

    async fn server_memory_info(&self) -> BackendResult<u64> {
        let mut conn = self.connection_manager.clone();
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(|e| classify("INFO", e))?;
        parse_used_memory(&info)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Redact credentials from a Redis URL for logging
fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let prefix = &url[..=colon_pos];
            let suffix = &url[at_pos..];
            return format!("{prefix}***{suffix}");
        }
    }
    url.to_string()
}
