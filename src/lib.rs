#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cache Governor
//!
//! Adaptive governance for a shared remote key-value cache.
//!
//! ## Overview
//!
//! A control loop observes the cache's runtime behavior (hit rate, key count,
//! memory footprint, backend health) and switches among competing management
//! policies to keep the cache effective under shifting load, while a circuit
//! breaker shields callers from backend outages.
//!
//! ## Module Organization
//!
//! - [`backend`] - Cache backend contract, in-memory and Redis backends, breaker-protected wrapper
//! - [`monitor`] - Access/update/hit/miss counters and metrics snapshots
//! - [`policy`] - Default, shrink, grow and TTL-retune policies, evaluator and registry
//! - [`governor`] - Holder and applier of the active policy
//! - [`controller`] - Adaptive strategy controller, hysteresis and scheduler
//! - [`resilience`] - Failure-rate circuit breaker
//! - [`cache`] - Namespaced read/write facade with local fallback
//! - [`bootstrap`] - Wiring from configuration
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cache_governor::backend::InMemoryBackend;
//! use cache_governor::bootstrap::GovernorSystem;
//! use cache_governor::config::GovernorConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = GovernorSystem::bootstrap(GovernorConfig::default(), Arc::new(InMemoryBackend::new()))?;
//!
//! let cache = system.cache("schemeSearchCache");
//! cache.put("hdfc", "{\"code\": 119551}").await;
//!
//! let scheduler = system.start();
//! // ... serve traffic ...
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod governor;
pub mod logging;
pub mod monitor;
pub mod policy;
pub mod resilience;

pub use backend::{BackendError, CacheBackend, InMemoryBackend, ProtectedBackend};
pub use bootstrap::GovernorSystem;
pub use cache::GovernedCache;
pub use config::{ConfigManager, GovernorConfig};
pub use controller::{AdaptiveScheduler, AdaptiveStrategyController, ControllerState, TickOutcome};
pub use error::{GovernorError, GovernorResult};
pub use governor::CacheGovernor;
pub use monitor::{CacheMonitor, MetricsSnapshot, SnapshotSource};
pub use policy::{CachePolicy, Evaluator, PolicyRegistry, StrategyName};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
