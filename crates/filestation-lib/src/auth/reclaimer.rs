// ============================
// filestation-lib/src/auth/reclaimer.rs
// ============================
//! Periodic reclaiming of expired auth state.
//!
//! Correctness never depends on this task: every lookup checks expiry
//! itself. The sweep only keeps the maps from growing without bound.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::auth::manager::AuthManager;

/// Handle to a running reclaimer task. Dropping it without calling
/// [`ReclaimerHandle::shutdown`] leaves the task running for the process
/// lifetime, which is the production behavior.
pub struct ReclaimerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Stop the reclaiming loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the reclaiming loop, sweeping on a fixed interval.
pub fn spawn_reclaimer(auth: Arc<AuthManager>, interval: Duration) -> ReclaimerHandle {
    let (shutdown, mut stop) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of `interval` fires immediately; consume it so the
        // first sweep happens one full interval after startup
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    auth.sweep_expired();
                }
                _ = stop.changed() => break,
            }
        }
    });
    ReclaimerHandle { shutdown, task }
}
