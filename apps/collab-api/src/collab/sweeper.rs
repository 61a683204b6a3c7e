//! Background task that periodically reclaims inactive project sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::coordinator::CollabCoordinator;

/// Spawn the sweeper. It calls [`CollabCoordinator::sweep`] once per `interval`
/// until the returned handle is aborted.
pub fn spawn(coordinator: Arc<CollabCoordinator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // First tick fires immediately; skip it.

        loop {
            ticker.tick().await;
            let evicted = coordinator.sweep();
            if evicted > 0 {
                tracing::info!(evicted, "swept inactive project sessions");
            } else {
                tracing::trace!("session sweep found nothing to evict");
            }
        }
    })
}
