//! # Resilience Module
//!
//! Shields the governance layer from cache backend outages. Every call that
//! touches the backend goes through a [`CircuitBreaker`], which tracks a
//! count-based sliding window of outcomes and short-circuits to a fallback
//! once the failure rate crosses the configured threshold.
//!
//! ## Usage
//!
//! ```rust
//! use cache_governor::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use cache_governor::backend::BackendError;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new("cache".to_string(), CircuitBreakerConfig::for_cache());
//!
//! let keys = breaker
//!     .execute(
//!         || async { Ok::<_, BackendError>(vec!["a".to_string()]) },
//!         Vec::new,
//!     )
//!     .await;
//! assert_eq!(keys.len(), 1);
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState, FailureClassification};
pub use config::CircuitBreakerConfig;
pub use metrics::CircuitBreakerMetrics;
