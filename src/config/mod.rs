//! # Cache Governor Configuration
//!
//! Serde-deserializable configuration tree for every tunable of the governance
//! subsystem. Every section carries defaults, so an empty source yields a
//! working configuration; [`GovernorConfig::validate`] rejects values the
//! runtime cannot honor.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cache_governor::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let stability = manager.config().adaptive_strategy.stability_threshold;
//! let breaker = manager.config().circuit_breaker.to_breaker_config();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::policy::PolicyConfig;
use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration for the cache governor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub circuit_breaker: CircuitBreakerSettings,
    pub adaptive_strategy: AdaptiveStrategySettings,
    pub evaluator: EvaluatorThresholds,
    pub policies: PolicySettings,
    pub monitor: MonitorSettings,
    pub cache: CacheSettings,
    pub backend: BackendSettings,
}

impl GovernorConfig {
    /// Validate every section, reporting the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        self.circuit_breaker
            .to_breaker_config()
            .validate()
            .map_err(|reason| {
                ConfigurationError::validation_error(format!("circuit_breaker: {reason}"))
            })?;

        if self.adaptive_strategy.interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "adaptive_strategy.interval_ms",
                "0",
                "tick interval must be greater than 0",
            ));
        }

        if self.adaptive_strategy.stability_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "adaptive_strategy.stability_threshold",
                "0",
                "stability threshold must be at least 1",
            ));
        }

        self.evaluator.validate()?;
        self.policies.validate()?;

        if self.monitor.scan_page_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "monitor.scan_page_size",
                "0",
                "scan page size must be greater than 0",
            ));
        }

        if self.cache.default_ttl_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.default_ttl_seconds",
                "0",
                "default TTL must be greater than 0",
            ));
        }

        if self.backend.kind == BackendKind::Redis && self.backend.redis_url.is_none() {
            return Err(ConfigurationError::missing_required_field(
                "redis_url",
                "backend (kind = redis)",
            ));
        }

        Ok(())
    }
}

/// File-facing circuit breaker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Percent of failed calls in the window that opens the circuit
    pub failure_rate_threshold: f64,
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    pub wait_duration_in_open_state_seconds: u64,
    pub permitted_calls_in_half_open_state: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_rate_threshold: defaults.failure_rate_threshold,
            sliding_window_size: defaults.sliding_window_size,
            minimum_number_of_calls: defaults.minimum_number_of_calls,
            wait_duration_in_open_state_seconds: defaults.wait_duration_in_open_state.as_secs(),
            permitted_calls_in_half_open_state: defaults.permitted_calls_in_half_open_state,
        }
    }
}

impl CircuitBreakerSettings {
    /// Convert to the runtime circuit breaker configuration
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls: self.minimum_number_of_calls,
            wait_duration_in_open_state: Duration::from_secs(
                self.wait_duration_in_open_state_seconds,
            ),
            permitted_calls_in_half_open_state: self.permitted_calls_in_half_open_state,
        }
    }
}

/// Control loop cadence and hysteresis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveStrategySettings {
    pub interval_ms: u64,
    /// Re-derivations of an unchanged strategy required before it is re-committed
    pub stability_threshold: u32,
}

impl Default for AdaptiveStrategySettings {
    fn default() -> Self {
        Self {
            interval_ms: 600_000,
            stability_threshold: 3,
        }
    }
}

impl AdaptiveStrategySettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Thresholds the evaluator compares a metrics snapshot against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorThresholds {
    pub shrink_max_hit_rate: f64,
    pub shrink_min_key_count: u64,
    pub grow_min_hit_rate: f64,
    pub grow_max_memory_bytes: u64,
    pub retune_max_hit_rate: f64,
}

impl Default for EvaluatorThresholds {
    fn default() -> Self {
        Self {
            shrink_max_hit_rate: 0.3,
            shrink_min_key_count: 10_000,
            grow_min_hit_rate: 0.8,
            grow_max_memory_bytes: 1_000_000_000,
            retune_max_hit_rate: 0.5,
        }
    }
}

impl EvaluatorThresholds {
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("evaluator.shrink_max_hit_rate", self.shrink_max_hit_rate),
            ("evaluator.grow_min_hit_rate", self.grow_min_hit_rate),
            ("evaluator.retune_max_hit_rate", self.retune_max_hit_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value.to_string(),
                    "hit rate thresholds must be within [0, 1]",
                ));
            }
        }
        Ok(())
    }
}

/// Policy tunables, expressed in seconds for file-friendliness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub default_ttl_seconds: u64,
    pub grow_ttl_seconds: u64,
    pub retune_ttl_seconds: u64,
    pub retune_min_ttl_seconds: u64,
    pub retune_max_ttl_seconds: u64,
    pub low_access_band: f64,
    pub high_access_band: f64,
    pub shrink_ttl_seconds: u64,
    /// Fraction (0, 1] of eligible keys removed per shrink pass
    pub shrink_reduction_fraction: f64,
    pub shrink_low_usage_threshold: f64,
    pub shrink_shortened_ttl_seconds: u64,
    /// Survivors past the eviction cutoff considered for TTL shortening
    pub shrink_adjust_window: usize,
    pub protected_key_prefix: String,
    pub preload_keys: Vec<String>,
    pub batch_size: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 900,
            grow_ttl_seconds: 7200,
            retune_ttl_seconds: 1800,
            retune_min_ttl_seconds: 900,
            retune_max_ttl_seconds: 7200,
            low_access_band: 10.0,
            high_access_band: 50.0,
            shrink_ttl_seconds: 1800,
            shrink_reduction_fraction: 0.3,
            shrink_low_usage_threshold: 5.0,
            shrink_shortened_ttl_seconds: 900,
            shrink_adjust_window: 100,
            protected_key_prefix: "critical:".to_string(),
            preload_keys: vec!["item1".to_string(), "item2".to_string(), "item3".to_string()],
            batch_size: 100,
        }
    }
}

impl PolicySettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.shrink_reduction_fraction > 0.0 && self.shrink_reduction_fraction <= 1.0) {
            return Err(ConfigurationError::invalid_value(
                "policies.shrink_reduction_fraction",
                self.shrink_reduction_fraction.to_string(),
                "must be within (0, 1]",
            ));
        }

        if self.retune_min_ttl_seconds == 0
            || self.retune_min_ttl_seconds > self.retune_max_ttl_seconds
        {
            return Err(ConfigurationError::invalid_value(
                "policies.retune_min_ttl_seconds",
                self.retune_min_ttl_seconds.to_string(),
                format!(
                    "floor must be positive and not exceed the ceiling ({}s)",
                    self.retune_max_ttl_seconds
                ),
            ));
        }

        if self.low_access_band < 0.0 || self.low_access_band >= self.high_access_band {
            return Err(ConfigurationError::invalid_value(
                "policies.low_access_band",
                self.low_access_band.to_string(),
                format!(
                    "must be non-negative and below high_access_band ({})",
                    self.high_access_band
                ),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "policies.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        for (field, seconds) in [
            ("policies.default_ttl_seconds", self.default_ttl_seconds),
            ("policies.grow_ttl_seconds", self.grow_ttl_seconds),
            ("policies.retune_ttl_seconds", self.retune_ttl_seconds),
            ("policies.shrink_ttl_seconds", self.shrink_ttl_seconds),
            (
                "policies.shrink_shortened_ttl_seconds",
                self.shrink_shortened_ttl_seconds,
            ),
        ] {
            if seconds == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "TTL must be greater than 0",
                ));
            }
        }

        Ok(())
    }

    /// Convert to the runtime policy configuration
    pub fn to_policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            default_ttl: Duration::from_secs(self.default_ttl_seconds),
            grow_ttl: Duration::from_secs(self.grow_ttl_seconds),
            retune_ttl: Duration::from_secs(self.retune_ttl_seconds),
            retune_min_ttl: Duration::from_secs(self.retune_min_ttl_seconds),
            retune_max_ttl: Duration::from_secs(self.retune_max_ttl_seconds),
            low_access_band: self.low_access_band,
            high_access_band: self.high_access_band,
            shrink_ttl: Duration::from_secs(self.shrink_ttl_seconds),
            shrink_reduction_fraction: self.shrink_reduction_fraction,
            shrink_low_usage_threshold: self.shrink_low_usage_threshold,
            shrink_shortened_ttl: Duration::from_secs(self.shrink_shortened_ttl_seconds),
            shrink_adjust_window: self.shrink_adjust_window,
            protected_key_prefix: self.protected_key_prefix.clone(),
            preload_keys: self.preload_keys.clone(),
            batch_size: self.batch_size,
        }
    }
}

/// Key enumeration and metric tagging for the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub scan_pattern: String,
    pub scan_page_size: usize,
    pub key_tags: KeyTagSettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scan_pattern: "*".to_string(),
            scan_page_size: 100,
            key_tags: KeyTagSettings::default(),
        }
    }
}

/// Explicit mapping from cache keys to metric tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTagSettings {
    /// Exact cache key to tag pairs, consulted first
    pub overrides: Vec<KeyTagOverride>,
    /// Namespace prefixes stripped from keys, first match wins
    pub namespace_prefixes: Vec<String>,
}

impl Default for KeyTagSettings {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            namespace_prefixes: vec![
                "schemeSearchCache::".to_string(),
                "transactionCache::".to_string(),
            ],
        }
    }
}

/// One explicit key to tag assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTagOverride {
    pub key: String,
    pub tag: String,
}

/// Read/write facade settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub default_ttl_seconds: u64,
    pub local_fallback_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 600,
            local_fallback_capacity: 1000,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub redis_url: Option<String>,
}
