use async_trait::async_trait;
use cache_governor::error::{GovernorError, GovernorResult};
use cache_governor::monitor::{MetricsSnapshot, SnapshotSource};
use cache_governor::resilience::CircuitState;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Snapshot for the given hit rate and key count with a healthy backend
pub fn snapshot(hit_rate: f64, key_count: u64) -> MetricsSnapshot {
    MetricsSnapshot {
        key_count,
        hit_rate,
        memory_usage_bytes: 1_000,
        backend_state: CircuitState::Closed,
    }
}

/// Replays a fixed sequence of snapshots; `None` entries fail the snapshot.
/// The last entry repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Option<MetricsSnapshot>>>,
    last: Mutex<Option<MetricsSnapshot>>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<MetricsSnapshot>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
        }
    }

    pub fn repeating(snapshot: MetricsSnapshot) -> Self {
        Self::new([Some(snapshot)])
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn snapshot(&self) -> GovernorResult<MetricsSnapshot> {
        let next = self.script.lock().pop_front();
        let entry = match next {
            Some(entry) => entry,
            None => *self.last.lock(),
        };

        match entry {
            Some(snapshot) => {
                *self.last.lock() = Some(snapshot);
                Ok(snapshot)
            }
            None => Err(GovernorError::Snapshot("scripted failure".to_string())),
        }
    }
}
