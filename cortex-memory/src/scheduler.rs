//! Background consolidation, run on an interval until cancelled.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::manager::MemoryManager;

/// Spawn a task that calls [`MemoryManager::consolidate`] on
/// `manager.config().consolidation_interval`, stopping when `cancel` fires.
///
/// Each pass is independent of the last; a slow or failed pass never
/// blocks the next tick from being scheduled, since `consolidate` itself
/// never returns an error (per-tier failures are logged and absorbed).
pub fn spawn_consolidation_loop(
    manager: Arc<MemoryManager>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let interval = manager.config().consolidation_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately, skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = manager.consolidate().await;
                    tracing::info!(?result, "consolidation pass complete");
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("consolidation loop cancelled");
                    break;
                }
            }
        }
    })
}
