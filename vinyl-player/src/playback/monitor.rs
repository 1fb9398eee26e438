//! Natural-finish monitor
//!
//! Each realtime connection runs one of these loops while it is open. The
//! loop asks the coordinator whether the track ended on its own; the
//! coordinator broadcasts `finished` to every subscriber when it did.
//!
//! The interval trades detection latency against backend polling load
//! (every backend poll is a network round trip in remote mode).

use crate::playback::SharedCoordinator;
use std::sync::TryLockError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

/// Aborts the monitor task when dropped
pub struct MonitorGuard(JoinHandle<()>);

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Start a finish-poll loop for one connection.
pub fn start_monitoring(coordinator: SharedCoordinator, interval: Duration) -> MonitorGuard {
    MonitorGuard(tokio::spawn(finish_check_task(coordinator, interval)))
}

async fn finish_check_task(coordinator: SharedCoordinator, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!("Finish monitor started ({}ms interval)", interval.as_millis());

    loop {
        ticker.tick().await;
        if let Err(e) = check_once(coordinator.clone(), interval).await {
            warn!("Finish check task failed: {}", e);
        }
    }
}

/// One poll. Skipped when a command holds the coordinator: the command's
/// own transition wins and the next tick looks again. Monitors on other
/// connections share the coordinator's throttle, so the backend sees one
/// poll per `interval` rather than one per connection.
pub async fn check_once(coordinator: SharedCoordinator, interval: Duration) -> Result<bool, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let finished = match coordinator.try_lock() {
            Ok(mut guard) => guard.check_finished_throttled(interval),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().check_finished_throttled(interval),
            Err(TryLockError::WouldBlock) => false,
        };
        finished
    })
    .await
}
