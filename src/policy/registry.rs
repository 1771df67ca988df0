//! Strategy name to policy lookup.

use super::{CachePolicy, GrowPolicy, PolicyConfig, RetuneTtlPolicy, ShrinkPolicy, StrategyName};
use std::str::FromStr;

/// Builds policies from a shared [`PolicyConfig`]. Lookups never fail.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    config: PolicyConfig,
}

impl PolicyRegistry {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn lookup(&self, name: StrategyName) -> CachePolicy {
        let c = &self.config;
        match name {
            StrategyName::Default => CachePolicy::Default {
                expiration: c.default_ttl,
            },
            StrategyName::Grow => CachePolicy::Grow(GrowPolicy::new(
                c.grow_ttl,
                c.preload_keys.clone(),
                c.batch_size,
            )),
            StrategyName::RetuneTtl => CachePolicy::RetuneTtl(RetuneTtlPolicy::new(
                c.retune_ttl,
                c.retune_min_ttl,
                c.retune_max_ttl,
                c.low_access_band,
                c.high_access_band,
                c.batch_size,
            )),
            StrategyName::Shrink => CachePolicy::Shrink(ShrinkPolicy::new(
                c.shrink_ttl,
                c.shrink_reduction_fraction,
                c.protected_key_prefix.clone(),
                c.shrink_low_usage_threshold,
                c.shrink_shortened_ttl,
                c.shrink_adjust_window,
                c.batch_size,
            )),
        }
    }

    /// Lookup by name; unknown names resolve to the default policy
    pub fn lookup_by_name(&self, name: &str) -> CachePolicy {
        self.lookup(StrategyName::from_str(name).unwrap_or(StrategyName::Default))
    }
}
