//! Periodic connection status report

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, instrument};

use crate::ping::{ConnectionTracker, StatusSnapshot};

/// Logs how many sessions sit in each connection state
pub struct StatusReporter {
    tracker: Arc<ConnectionTracker>,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(tracker: Arc<ConnectionTracker>, interval: Duration) -> Self {
        Self { tracker, interval }
    }

    /// Run the reporter (call in a spawned task)
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting status reporter with {}s interval",
            self.interval.as_secs()
        );

        let mut ticker = interval(self.interval);
        ticker.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.report();
                        info!("Status reporter shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn report(&self) -> StatusSnapshot {
        let snapshot = self.tracker.snapshot();
        info!(
            sessions = snapshot.sessions(),
            connected = snapshot.connected,
            disconnected = snapshot.disconnected,
            none = snapshot.none,
            latest = %snapshot.latest,
            failures = snapshot.total_failures,
            "Connection status"
        );
        snapshot
    }
}
