//! Periodic trigger for fetch cycles.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::orchestrator::{FetchOrchestrator, RunOutcome};

/// Default time between fetch cycles.
pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Run one cycle immediately, then one per `interval` until `shutdown` fires.
///
/// Each tick spawns its cycle, so a tick that lands while the previous cycle
/// is still in flight is dropped by the orchestrator rather than queued.
/// After `shutdown` the returned task resolves only once any in-flight cycle
/// has finished.
pub fn spawn_fetch_schedule(
    orchestrator: Arc<FetchOrchestrator>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Fetch schedule started (every {:?})", interval);

        let cycles = TaskTracker::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let orchestrator = orchestrator.clone();
                    cycles.spawn(async move {
                        if orchestrator.run().await == RunOutcome::Skipped {
                            tracing::warn!("Previous fetch cycle still running, tick dropped");
                        }
                    });
                }
            }
        }

        cycles.close();
        cycles.wait().await;
        tracing::info!("Fetch schedule stopped");
    })
}
