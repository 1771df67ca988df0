//! # Governor Bootstrap
//!
//! Wires the subsystem together from a validated [`GovernorConfig`]: one
//! circuit breaker shared by every backend call path, the monitor, the
//! governor and the adaptive controller.

use crate::backend::{CacheBackend, InMemoryBackend, ProtectedBackend};
use crate::cache::GovernedCache;
use crate::config::{BackendKind, BackendSettings, ConfigurationError, GovernorConfig};
use crate::constants::components;
use crate::controller::{AdaptiveScheduler, AdaptiveStrategyController, ControllerState};
use crate::error::GovernorResult;
use crate::governor::CacheGovernor;
use crate::monitor::{CacheMonitor, InMemoryMeterRegistry, KeyTagMapper, MetricsRegistry};
use crate::policy::{Evaluator, PolicyRegistry, StrategyName};
use crate::resilience::{CircuitBreaker, CircuitBreakerMetrics};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Fully wired cache governance subsystem
#[derive(Debug, Clone)]
pub struct GovernorSystem {
    config: GovernorConfig,
    breaker: Arc<CircuitBreaker>,
    backend: ProtectedBackend,
    monitor: CacheMonitor,
    governor: Arc<CacheGovernor>,
    controller: Arc<AdaptiveStrategyController>,
}

/// Point-in-time view of the subsystem for operators
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub backend: &'static str,
    pub active_strategy: Option<StrategyName>,
    pub controller_state: ControllerState,
    pub circuit_breaker: CircuitBreakerMetrics,
}

impl GovernorSystem {
    /// Bootstrap with an in-process metrics registry
    pub fn bootstrap(config: GovernorConfig, backend: Arc<dyn CacheBackend>) -> GovernorResult<Self> {
        Self::bootstrap_with_registry(config, backend, Arc::new(InMemoryMeterRegistry::new()))
    }

    pub fn bootstrap_with_registry(
        config: GovernorConfig,
        backend: Arc<dyn CacheBackend>,
        registry: Arc<dyn MetricsRegistry>,
    ) -> GovernorResult<Self> {
        config.validate()?;

        let breaker = Arc::new(CircuitBreaker::new(
            components::CACHE_BACKEND.to_string(),
            config.circuit_breaker.to_breaker_config(),
        ));
        let protected = ProtectedBackend::new(backend, breaker.clone());

        let monitor = CacheMonitor::new(
            registry,
            KeyTagMapper::from_settings(&config.monitor.key_tags),
            protected.clone(),
            config.monitor.scan_pattern.clone(),
            config.monitor.scan_page_size,
        );

        let governor = Arc::new(CacheGovernor::new(
            Arc::new(protected.clone()),
            monitor.access_counts(),
        ));

        let controller = Arc::new(AdaptiveStrategyController::new(
            Arc::new(monitor.clone()),
            Evaluator::new(config.evaluator.clone()),
            PolicyRegistry::new(config.policies.to_policy_config()),
            governor.clone(),
            config.adaptive_strategy.stability_threshold,
        ));

        info!(
            backend = protected.backend_name(),
            stability_threshold = config.adaptive_strategy.stability_threshold,
            interval_ms = config.adaptive_strategy.interval_ms,
            "Cache governor bootstrapped"
        );

        Ok(Self {
            config,
            breaker,
            backend: protected,
            monitor,
            governor,
            controller,
        })
    }

    /// Build the backend named by configuration
    pub async fn connect_backend(settings: &BackendSettings) -> GovernorResult<Arc<dyn CacheBackend>> {
        match settings.kind {
            BackendKind::Memory => Ok(Arc::new(InMemoryBackend::new())),
            #[cfg(feature = "redis-backend")]
            BackendKind::Redis => {
                let url = settings.redis_url.as_deref().ok_or_else(|| {
                    ConfigurationError::missing_required_field("redis_url", "backend")
                })?;
                Ok(Arc::new(crate::backend::RedisBackend::connect(url).await?))
            }
            #[cfg(not(feature = "redis-backend"))]
            BackendKind::Redis => Err(ConfigurationError::invalid_value(
                "backend.kind",
                "redis",
                "built without the `redis-backend` feature",
            )
            .into()),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn monitor(&self) -> &CacheMonitor {
        &self.monitor
    }

    pub fn governor(&self) -> &Arc<CacheGovernor> {
        &self.governor
    }

    pub fn controller(&self) -> &Arc<AdaptiveStrategyController> {
        &self.controller
    }

    /// A namespaced read/write cache sharing this system's breaker and monitor
    pub fn cache(&self, name: &str) -> GovernedCache {
        GovernedCache::new(
            name,
            self.backend.clone(),
            self.monitor.clone(),
            self.governor.clone(),
            self.config.cache.default_ttl(),
            self.config.cache.local_fallback_capacity,
        )
    }

    /// Start the periodic control loop
    pub fn start(&self) -> AdaptiveScheduler {
        AdaptiveScheduler::spawn(
            self.controller.clone(),
            self.config.adaptive_strategy.interval(),
        )
    }

    pub async fn status(&self) -> SystemStatus {
        SystemStatus {
            backend: self.backend.backend_name(),
            active_strategy: self.governor.active_strategy(),
            controller_state: self.controller.state().await,
            circuit_breaker: self.breaker.metrics(),
        }
    }
}
