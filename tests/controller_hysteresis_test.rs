//! Controller behavior across sequences of ticks.

mod common;

use cache_governor::controller::{ControllerState, TickOutcome};
use cache_governor::monitor::InMemoryMeterRegistry;
use cache_governor::policy::StrategyName;
use common::*;
use std::sync::Arc;

#[tokio::test]
async fn test_repeated_strategy_changes_active_policy_once() {
    let backend = RecordingBackend::with_keys(["a", "b", "c"]);
    // hit rate 0.4 on a small cache selects RETUNE_TTL every tick
    let controller = controller_for(
        Arc::new(ScriptedSource::repeating(snapshot(0.4, 3))),
        Arc::new(backend.clone()),
        Arc::new(InMemoryMeterRegistry::new()),
        3,
    );

    let mut active = Vec::new();
    for _ in 0..10 {
        controller.run_cycle().await;
        active.push(controller.governor().active_strategy());
    }

    let changes = active.windows(2).filter(|pair| pair[0] != pair[1]).count();
    assert_eq!(changes, 0);
    assert!(active.iter().all(|s| *s == Some(StrategyName::RetuneTtl)));
}

#[tokio::test]
async fn test_unchanged_strategy_commits_from_third_repeat_on() {
    let backend = RecordingBackend::with_keys(["a", "b"]);
    let registry = Arc::new(InMemoryMeterRegistry::new());
    let controller = controller_for(
        Arc::new(ScriptedSource::new([
            Some(snapshot(0.6, 2)),
            Some(snapshot(0.4, 2)),
            Some(snapshot(0.4, 2)),
            Some(snapshot(0.4, 2)),
            Some(snapshot(0.4, 2)),
            Some(snapshot(0.4, 2)),
        ])),
        Arc::new(backend.clone()),
        registry,
        3,
    );

    assert_eq!(
        controller.run_cycle().await,
        TickOutcome::Committed(StrategyName::Default)
    );

    // The change to RETUNE_TTL commits immediately
    backend.clear_journal();
    assert_eq!(
        controller.run_cycle().await,
        TickOutcome::Committed(StrategyName::RetuneTtl)
    );
    assert_eq!(backend.ttl_updates().len(), 2);

    // Repeats one and two are held back without touching the backend
    for expected_matches in 1..=2 {
        backend.clear_journal();
        assert_eq!(
            controller.run_cycle().await,
            TickOutcome::Deferred {
                strategy: StrategyName::RetuneTtl,
                consecutive_matches: expected_matches,
            }
        );
        assert!(backend.calls().is_empty());
    }

    // The third repeat re-applies the policy
    backend.clear_journal();
    assert_eq!(
        controller.run_cycle().await,
        TickOutcome::Committed(StrategyName::RetuneTtl)
    );
    assert_eq!(backend.ttl_updates().len(), 2);

    // Past the threshold every further repeat re-applies
    backend.clear_journal();
    assert_eq!(
        controller.run_cycle().await,
        TickOutcome::Committed(StrategyName::RetuneTtl)
    );
    assert_eq!(backend.ttl_updates().len(), 2);
    assert_eq!(
        controller.state().await,
        ControllerState {
            last_applied_strategy: Some(StrategyName::RetuneTtl),
            consecutive_matches: 4,
        }
    );
}

#[tokio::test]
async fn test_failed_snapshot_leaves_state_untouched() {
    let backend = RecordingBackend::new();
    let controller = controller_for(
        Arc::new(ScriptedSource::new([
            Some(snapshot(0.9, 10)),
            Some(snapshot(0.9, 10)),
            None,
            Some(snapshot(0.9, 10)),
        ])),
        Arc::new(backend),
        Arc::new(InMemoryMeterRegistry::new()),
        3,
    );

    controller.run_cycle().await;
    controller.run_cycle().await;
    let before = controller.state().await;
    assert_eq!(before.consecutive_matches, 1);

    assert_eq!(controller.run_cycle().await, TickOutcome::Skipped);
    assert_eq!(controller.state().await, before);

    assert_eq!(
        controller.run_cycle().await,
        TickOutcome::Deferred {
            strategy: StrategyName::Grow,
            consecutive_matches: 2,
        }
    );
}

#[tokio::test]
async fn test_backend_outage_does_not_fail_the_tick() {
    let backend = RecordingBackend::with_keys(["a", "b", "c"]);
    backend.set_outage(true);
    let controller = controller_for(
        Arc::new(ScriptedSource::repeating(snapshot(0.4, 3))),
        Arc::new(backend.clone()),
        Arc::new(InMemoryMeterRegistry::new()),
        3,
    );

    // The breaker turns the failing scan into an empty key set
    assert_eq!(
        controller.run_cycle().await,
        TickOutcome::Committed(StrategyName::RetuneTtl)
    );
    assert!(backend.ttl_updates().is_empty());
    assert_eq!(backend.store().len(), 3);
}

#[tokio::test]
async fn test_concurrent_cycles_are_serialized() {
    let backend = RecordingBackend::with_keys(["a"]);
    let controller = Arc::new(controller_for(
        Arc::new(ScriptedSource::repeating(snapshot(0.4, 1))),
        Arc::new(backend),
        Arc::new(InMemoryMeterRegistry::new()),
        3,
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let controller = controller.clone();
        handles.push(tokio::spawn(async move { controller.run_cycle().await }));
    }
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    // One initial commit, two deferred repeats, then a commit at the threshold
    let commits = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::Committed(_)))
        .count();
    assert_eq!(commits, 2);
    assert_eq!(controller.state().await.consecutive_matches, 3);
}
