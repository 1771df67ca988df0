use cache_governor::monitor::MetricsSnapshot;
use cache_governor::resilience::CircuitState;
use proptest::prelude::*;

/// Strategy for generating circuit states
pub fn circuit_state_strategy() -> impl Strategy<Value = CircuitState> {
    prop_oneof![
        Just(CircuitState::Closed),
        Just(CircuitState::Open),
        Just(CircuitState::HalfOpen),
    ]
}

/// Strategy for generating snapshots, including values on every threshold
pub fn snapshot_strategy() -> impl Strategy<Value = MetricsSnapshot> {
    (
        prop_oneof![0.0f64..=1.0, Just(0.3), Just(0.5), Just(0.8)],
        prop_oneof![0u64..50_000, Just(10_000u64)],
        prop_oneof![0u64..2_000_000_000, Just(1_000_000_000u64)],
        circuit_state_strategy(),
    )
        .prop_map(|(hit_rate, key_count, memory_usage_bytes, backend_state)| MetricsSnapshot {
            key_count,
            hit_rate,
            memory_usage_bytes,
            backend_state,
        })
}

/// Strategy for generating (key suffix, access count) pairs for a cache population
pub fn key_population_strategy() -> impl Strategy<Value = Vec<(u16, u8)>> {
    prop::collection::vec((any::<u16>(), 0u8..40), 0..60)
}
