// ABOUTME: Background task removing sandboxes orphaned by crashed or killed processes
// ABOUTME: Periodically sweeps managed containers older than a maximum age

use crate::gateway::RuntimeGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Spawn a periodic sweep of stale sandboxes
///
/// Errors are logged but don't stop the task. The first sweep runs immediately.
pub fn start_reaper_task(
    gateway: Arc<RuntimeGateway>,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            "Started stale sandbox reaper (interval: {:?}, max age: {:?})",
            interval, max_age
        );

        loop {
            ticker.tick().await;

            match gateway.reap_stale_sandboxes(max_age).await {
                Ok(removed) if !removed.is_empty() => {
                    info!("Reaped {} stale sandboxes: {:?}", removed.len(), removed);
                }
                Ok(_) => {}
                Err(e) => error!("Error during stale sandbox sweep: {}", e),
            }
        }
    })
}
