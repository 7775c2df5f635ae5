//! Heartbeat loop for one established session

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use super::tracker::{ConnectionTracker, PingOutcome};
use crate::client::{ApiCaller, EndpointRotator};
use crate::models::Session;

/// Result of one pass through the loop body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    /// The session pinged less than one interval ago; nothing was sent
    Throttled,
    Pinged {
        endpoint: String,
        outcome: PingOutcome,
    },
}

/// Why a ping loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    LoggedOut,
}

/// Sends heartbeats for a session, at most once per interval
pub struct PingLoop {
    caller: Arc<dyn ApiCaller>,
    rotator: Arc<EndpointRotator>,
    tracker: Arc<ConnectionTracker>,
    interval: Duration,
}

impl PingLoop {
    pub fn new(
        caller: Arc<dyn ApiCaller>,
        rotator: Arc<EndpointRotator>,
        tracker: Arc<ConnectionTracker>,
        interval: Duration,
    ) -> Self {
        Self {
            caller,
            rotator,
            tracker,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Heartbeat body: `{id, browser_id, timestamp}`
    pub fn heartbeat(session: &Session) -> Value {
        json!({
            "id": session.uid(),
            "browser_id": session.browser_id.to_string(),
            "timestamp": Utc::now().timestamp(),
        })
    }

    /// Ping once unless this session pinged within the last interval
    pub async fn tick(&self, session: &mut Session) -> TickResult {
        let key = session.key.clone();
        let now = Instant::now();

        if let Some(last) = self.tracker.last_ping(&key) {
            if now.duration_since(last) < self.interval {
                debug!("Ping for {} throttled", key);
                return TickResult::Throttled;
            }
        }
        self.tracker.mark_ping(&key, now);

        let endpoint = self.rotator.next().to_string();
        let body = Self::heartbeat(session);
        let result = self
            .caller
            .call(&endpoint, &body, key.proxy(), key.token())
            .await;

        let outcome = PingOutcome::classify(&result);
        let state = self.tracker.apply(&key, &outcome);

        match &outcome {
            PingOutcome::Success => {
                info!(
                    proxy = %key.proxy(),
                    token = %key.fingerprint(),
                    endpoint = %endpoint,
                    "Ping sent successfully"
                );
            }
            PingOutcome::Logout => {
                session.logout();
                info!(
                    proxy = %key.proxy(),
                    token = %key.fingerprint(),
                    "Logged out and cleared session info"
                );
            }
            PingOutcome::Failure(reason) => {
                warn!(
                    proxy = %key.proxy(),
                    token = %key.fingerprint(),
                    endpoint = %endpoint,
                    failures = self.tracker.failures(&key),
                    state = %state,
                    "Ping failed: {}",
                    reason
                );
            }
        }

        TickResult::Pinged { endpoint, outcome }
    }

    /// Ping until the service logs the session out or shutdown is signalled
    ///
    /// Sleeps one interval after every pass, whatever its result. A call
    /// still in flight when shutdown is signalled is abandoned.
    #[instrument(skip_all, fields(proxy = %session.key.proxy(), token = %session.key.fingerprint()))]
    pub async fn run(&self, mut session: Session, mut shutdown: watch::Receiver<bool>) -> LoopExit {
        loop {
            if *shutdown.borrow() {
                return LoopExit::Shutdown;
            }

            let result = tokio::select! {
                result = self.tick(&mut session) => result,
                _ = shutdown.wait_for(|stop| *stop) => return LoopExit::Shutdown,
            };

            if let TickResult::Pinged {
                outcome: PingOutcome::Logout,
                ..
            } = result
            {
                return LoopExit::LoggedOut;
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return LoopExit::Shutdown;
                    }
                }
            }
        }
    }
}
