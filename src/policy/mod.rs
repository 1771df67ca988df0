//! # Cache Policies
//!
//! The closed set of cache management strategies, the evaluator that picks
//! one from a metrics snapshot, and the registry that turns a
//! [`StrategyName`] into a runnable [`CachePolicy`].
//!
//! Policies are stateless values. Applying one touches the backend only
//! through the [`CacheBackend`] contract; in production that backend is a
//! [`ProtectedBackend`](crate::backend::ProtectedBackend), so an outage turns
//! each backend call into a neutral no-op instead of an error.

pub mod evaluator;
pub mod grow;
pub mod registry;
pub mod retune;
pub mod shrink;

use crate::backend::CacheBackend;
use crate::error::{GovernorError, GovernorResult};
use crate::logging::log_policy_operation;
use crate::monitor::AccessCounts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use evaluator::Evaluator;
pub use grow::GrowPolicy;
pub use registry::PolicyRegistry;
pub use retune::RetuneTtlPolicy;
pub use shrink::{KeyMetadata, ShrinkPolicy};

/// Pattern every policy enumerates keys with
pub(crate) const ALL_KEYS: &str = "*";

/// Name of a cache management strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyName {
    Default,
    Shrink,
    Grow,
    RetuneTtl,
}

impl StrategyName {
    pub const ALL: [StrategyName; 4] = [
        StrategyName::Default,
        StrategyName::Shrink,
        StrategyName::Grow,
        StrategyName::RetuneTtl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::Default => "DEFAULT",
            StrategyName::Shrink => "SHRINK",
            StrategyName::Grow => "GROW",
            StrategyName::RetuneTtl => "RETUNE_TTL",
        }
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyName {
    type Err = GovernorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "DEFAULT" => Ok(StrategyName::Default),
            "SHRINK" => Ok(StrategyName::Shrink),
            "GROW" => Ok(StrategyName::Grow),
            "RETUNE_TTL" => Ok(StrategyName::RetuneTtl),
            other => Err(GovernorError::Policy(format!("Unknown strategy: {other}"))),
        }
    }
}

/// Runtime policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub default_ttl: Duration,
    pub grow_ttl: Duration,
    pub retune_ttl: Duration,
    pub retune_min_ttl: Duration,
    pub retune_max_ttl: Duration,
    pub low_access_band: f64,
    pub high_access_band: f64,
    pub shrink_ttl: Duration,
    pub shrink_reduction_fraction: f64,
    pub shrink_low_usage_threshold: f64,
    pub shrink_shortened_ttl: Duration,
    pub shrink_adjust_window: usize,
    pub protected_key_prefix: String,
    pub preload_keys: Vec<String>,
    pub batch_size: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        crate::config::PolicySettings::default().to_policy_config()
    }
}

/// What a single policy application did to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub keys_scanned: u64,
    pub keys_deleted: u64,
    pub ttl_adjusted: u64,
    pub keys_preloaded: u64,
}

impl PolicyOutcome {
    pub fn affected_keys(&self) -> u64 {
        self.keys_deleted + self.ttl_adjusted + self.keys_preloaded
    }
}

/// One of the four cache management strategies
#[derive(Debug, Clone, PartialEq)]
pub enum CachePolicy {
    /// Leaves the cache alone
    Default { expiration: Duration },
    Shrink(ShrinkPolicy),
    Grow(GrowPolicy),
    RetuneTtl(RetuneTtlPolicy),
}

impl CachePolicy {
    pub fn name(&self) -> StrategyName {
        match self {
            CachePolicy::Default { .. } => StrategyName::Default,
            CachePolicy::Shrink(_) => StrategyName::Shrink,
            CachePolicy::Grow(_) => StrategyName::Grow,
            CachePolicy::RetuneTtl(_) => StrategyName::RetuneTtl,
        }
    }

    /// Nominal TTL for entries written while this policy is active
    pub fn expiration_time(&self) -> Duration {
        match self {
            CachePolicy::Default { expiration } => *expiration,
            CachePolicy::Shrink(policy) => policy.expiration_time(),
            CachePolicy::Grow(policy) => policy.expiration_time(),
            CachePolicy::RetuneTtl(policy) => policy.expiration_time(),
        }
    }

    pub async fn apply(
        &self,
        backend: &dyn CacheBackend,
        access: &AccessCounts,
    ) -> GovernorResult<PolicyOutcome> {
        let name = self.name();
        let result = match self {
            CachePolicy::Default { .. } => Ok(PolicyOutcome::default()),
            CachePolicy::Shrink(policy) => policy.apply(backend, access).await,
            CachePolicy::Grow(policy) => policy.apply(backend).await,
            CachePolicy::RetuneTtl(policy) => policy.apply(backend, access).await,
        };

        match &result {
            Ok(outcome) => log_policy_operation(
                name.as_str(),
                "apply",
                outcome.affected_keys(),
                "success",
                None,
            ),
            Err(e) => log_policy_operation(
                name.as_str(),
                "apply",
                0,
                "failed",
                Some(&e.to_string()),
            ),
        }

        result
    }
}
