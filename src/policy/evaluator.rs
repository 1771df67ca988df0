//! Strategy selection from a metrics snapshot.

use super::StrategyName;
use crate::config::EvaluatorThresholds;
use crate::monitor::MetricsSnapshot;

/// Pure mapping from a snapshot to a strategy, first matching rule wins:
///
/// 1. low hit rate on a large cache: [`StrategyName::Shrink`]
/// 2. high hit rate with memory headroom: [`StrategyName::Grow`]
/// 3. mediocre hit rate: [`StrategyName::RetuneTtl`]
/// 4. anything else: [`StrategyName::Default`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluator {
    thresholds: EvaluatorThresholds,
}

impl Evaluator {
    pub fn new(thresholds: EvaluatorThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EvaluatorThresholds {
        &self.thresholds
    }

    pub fn select(&self, snapshot: &MetricsSnapshot) -> StrategyName {
        let t = &self.thresholds;

        if snapshot.hit_rate < t.shrink_max_hit_rate && snapshot.key_count > t.shrink_min_key_count
        {
            StrategyName::Shrink
        } else if snapshot.hit_rate > t.grow_min_hit_rate
            && snapshot.memory_usage_bytes < t.grow_max_memory_bytes
        {
            StrategyName::Grow
        } else if snapshot.hit_rate < t.retune_max_hit_rate {
            StrategyName::RetuneTtl
        } else {
            StrategyName::Default
        }
    }
}
