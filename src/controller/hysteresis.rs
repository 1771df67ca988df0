//! Anti-thrashing guard for strategy commits.

use crate::policy::StrategyName;
use serde::{Deserialize, Serialize};

/// Controller memory carried from one tick to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub last_applied_strategy: Option<StrategyName>,
    /// Ticks in a row that re-derived `last_applied_strategy` since it last changed
    pub consecutive_matches: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HysteresisDecision {
    Commit,
    Defer,
}

impl ControllerState {
    /// State after an explicit commit of `strategy`
    pub fn committed(strategy: StrategyName) -> Self {
        Self {
            last_applied_strategy: Some(strategy),
            consecutive_matches: 0,
        }
    }

    /// Decide whether `selected` should be committed and compute the state
    /// to keep if this tick completes.
    ///
    /// A strategy is committed when nothing was applied yet, when it differs
    /// from the last applied one, or when it has been re-derived
    /// `stability_threshold` times in a row. Only a change of strategy resets
    /// the match count, so a strategy past the threshold commits every tick.
    pub fn observe(
        &self,
        selected: StrategyName,
        stability_threshold: u32,
    ) -> (HysteresisDecision, ControllerState) {
        match self.last_applied_strategy {
            Some(last) if last == selected => {
                let next = Self {
                    last_applied_strategy: Some(last),
                    consecutive_matches: self.consecutive_matches.saturating_add(1),
                };
                if next.consecutive_matches >= stability_threshold {
                    (HysteresisDecision::Commit, next)
                } else {
                    (HysteresisDecision::Defer, next)
                }
            }
            _ => (HysteresisDecision::Commit, Self::committed(selected)),
        }
    }
}
