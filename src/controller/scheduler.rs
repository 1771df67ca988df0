//! Fixed-interval driver for the adaptive controller.

use super::AdaptiveStrategyController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Background task running [`AdaptiveStrategyController::run_cycle`] on a
/// fixed cadence. The first cycle runs immediately; ticks missed while a
/// slow cycle was running are skipped rather than replayed.
#[derive(Debug)]
pub struct AdaptiveScheduler {
    handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AdaptiveScheduler {
    pub fn spawn(controller: Arc<AdaptiveStrategyController>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        info!(interval_ms = period.as_millis() as u64, "Starting adaptive strategy scheduler");

        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Adaptive strategy scheduler stopping");
                        break;
                    }
                    _ = timer.tick() => {
                        let outcome = controller.run_cycle().await;
                        debug!(outcome = ?outcome, "Adaptive strategy cycle finished");
                    }
                }
            }
        });

        Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop after the in-flight cycle, if any, completes
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Adaptive strategy scheduler task ended abnormally");
        }
    }
}
