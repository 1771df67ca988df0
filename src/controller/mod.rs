//! # Adaptive Strategy Controller
//!
//! The control loop: snapshot the cache, select a strategy, run it through
//! the hysteresis guard and, when warranted, commit the matching policy to
//! the governor.
//!
//! ## Tick Flow
//!
//! 1. `SnapshotSource::snapshot()`; a failed snapshot skips the tick
//! 2. `Evaluator::select(snapshot)`
//! 3. `ControllerState::observe(selected, stability_threshold)`
//! 4. On commit: `PolicyRegistry::lookup` then `CacheGovernor::set_policy`
//!
//! A tick never returns an error and never panics outward. When a tick fails
//! the controller state is left exactly as it was before the tick.

pub mod hysteresis;
pub mod scheduler;

use crate::constants::components;
use crate::error::GovernorResult;
use crate::governor::CacheGovernor;
use crate::monitor::SnapshotSource;
use crate::policy::{Evaluator, PolicyOutcome, PolicyRegistry, StrategyName};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub use hysteresis::{ControllerState, HysteresisDecision};
pub use scheduler::AdaptiveScheduler;

/// What one controller tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// The strategy's policy was applied
    Committed(StrategyName),
    /// The strategy was re-derived but not yet stable enough to re-apply
    Deferred {
        strategy: StrategyName,
        consecutive_matches: u32,
    },
    /// The tick failed and was abandoned
    Skipped,
}

#[derive(Debug)]
pub struct AdaptiveStrategyController {
    source: Arc<dyn SnapshotSource>,
    evaluator: Evaluator,
    registry: PolicyRegistry,
    governor: Arc<CacheGovernor>,
    stability_threshold: u32,
    /// Held for the whole tick, and by `force_strategy`
    state: Mutex<ControllerState>,
}

impl AdaptiveStrategyController {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        evaluator: Evaluator,
        registry: PolicyRegistry,
        governor: Arc<CacheGovernor>,
        stability_threshold: u32,
    ) -> Self {
        Self {
            source,
            evaluator,
            registry,
            governor,
            stability_threshold: stability_threshold.max(1),
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn governor(&self) -> &Arc<CacheGovernor> {
        &self.governor
    }

    pub async fn state(&self) -> ControllerState {
        *self.state.lock().await
    }

    /// Run one adaptation cycle. Overlapping calls are serialized.
    pub async fn run_cycle(&self) -> TickOutcome {
        let mut state = self.state.lock().await;
        let before = *state;

        match AssertUnwindSafe(self.tick(before)).catch_unwind().await {
            Ok(Ok((outcome, next))) => {
                *state = next;
                outcome
            }
            Ok(Err(e)) => {
                error!(
                    component = components::ADAPTIVE_CONTROLLER,
                    error = %e,
                    last_applied = ?before.last_applied_strategy,
                    "Adaptive strategy cycle failed, state unchanged"
                );
                TickOutcome::Skipped
            }
            Err(panic) => {
                error!(
                    component = components::ADAPTIVE_CONTROLLER,
                    panic = %panic_message(panic.as_ref()),
                    last_applied = ?before.last_applied_strategy,
                    "Adaptive strategy cycle panicked, state unchanged"
                );
                TickOutcome::Skipped
            }
        }
    }

    async fn tick(
        &self,
        state: ControllerState,
    ) -> GovernorResult<(TickOutcome, ControllerState)> {
        let snapshot = self.source.snapshot().await?;
        let selected = self.evaluator.select(&snapshot);
        let (decision, next) = state.observe(selected, self.stability_threshold);

        debug!(
            selected = %selected,
            hit_rate = snapshot.hit_rate,
            key_count = snapshot.key_count,
            memory_usage_bytes = snapshot.memory_usage_bytes,
            backend_state = %snapshot.backend_state,
            decision = ?decision,
            "Evaluated cache strategy"
        );

        match decision {
            HysteresisDecision::Commit => {
                let outcome = self
                    .governor
                    .set_policy(self.registry.lookup(selected))
                    .await?;
                info!(
                    component = components::ADAPTIVE_CONTROLLER,
                    strategy = %selected,
                    previous = ?state.last_applied_strategy,
                    affected_keys = outcome.affected_keys(),
                    "Applied cache strategy"
                );
                Ok((TickOutcome::Committed(selected), next))
            }
            HysteresisDecision::Defer => {
                debug!(
                    strategy = %selected,
                    consecutive_matches = next.consecutive_matches,
                    stability_threshold = self.stability_threshold,
                    "Strategy unchanged, waiting for stability"
                );
                Ok((
                    TickOutcome::Deferred {
                        strategy: selected,
                        consecutive_matches: next.consecutive_matches,
                    },
                    next,
                ))
            }
        }
    }

    /// Operator override: apply `strategy` now and make it the last applied
    /// strategy, resetting the match count.
    pub async fn force_strategy(&self, strategy: StrategyName) -> GovernorResult<PolicyOutcome> {
        let mut state = self.state.lock().await;
        info!(strategy = %strategy, previous = ?state.last_applied_strategy, "Forcing cache strategy");

        let outcome = self
            .governor
            .set_policy(self.registry.lookup(strategy))
            .await?;
        *state = ControllerState::committed(strategy);
        Ok(outcome)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
