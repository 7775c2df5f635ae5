//! Connection state per session plus the process-wide latest state

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::{ConnectionState, Envelope, SessionKey};

/// What a single ping attempt amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingOutcome {
    Success,
    Logout,
    Failure(String),
}

impl PingOutcome {
    pub fn classify(result: &Result<Envelope>) -> Self {
        match result {
            Ok(envelope) if envelope.is_success() => PingOutcome::Success,
            Ok(envelope) if envelope.is_logout() => PingOutcome::Logout,
            Ok(envelope) => PingOutcome::Failure(format!("service returned code {}", envelope.code)),
            Err(e) => PingOutcome::Failure(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SessionStatus {
    state: ConnectionState,
    consecutive_failures: u32,
    last_ping: Option<Instant>,
    last_error: Option<String>,
}

/// Counts of sessions per state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub connected: usize,
    pub disconnected: usize,
    pub none: usize,
    pub latest: ConnectionState,
    pub total_failures: u64,
}

impl StatusSnapshot {
    pub fn sessions(&self) -> usize {
        self.connected + self.disconnected + self.none
    }
}

/// Tracks the connection state of every (token, proxy) session
///
/// `latest` mirrors the single shared status of the service's own client:
/// whichever session finished a ping last decides it. Per-session state is
/// kept alongside so one proxy's failures stay attributable.
#[derive(Debug)]
pub struct ConnectionTracker {
    sessions: DashMap<SessionKey, SessionStatus>,
    latest: AtomicU8,
    total_failures: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            latest: AtomicU8::new(ConnectionState::NoConnection.code()),
            total_failures: AtomicU64::new(0),
        }
    }

    /// Apply the transition for one ping outcome and return the new state
    pub fn apply(&self, key: &SessionKey, outcome: &PingOutcome) -> ConnectionState {
        let mut entry = self.sessions.entry(key.clone()).or_default();

        let state = match outcome {
            PingOutcome::Success => {
                entry.consecutive_failures = 0;
                entry.last_error = None;
                self.total_failures.store(0, Ordering::Relaxed);
                ConnectionState::Connected
            }
            PingOutcome::Logout => {
                entry.last_error = Some("logged out".to_string());
                ConnectionState::NoConnection
            }
            PingOutcome::Failure(reason) => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
                entry.last_error = Some(reason.clone());
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                ConnectionState::Disconnected
            }
        };

        entry.state = state;
        self.latest.store(state.code(), Ordering::Release);
        state
    }

    /// Record a session that ended without ever connecting
    pub fn mark_logged_out(&self, key: &SessionKey) {
        self.apply(key, &PingOutcome::Logout);
    }

    pub fn status(&self, key: &SessionKey) -> ConnectionState {
        self.sessions
            .get(key)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    /// State written by the most recent ping across all sessions
    pub fn latest(&self) -> ConnectionState {
        ConnectionState::from_code(self.latest.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn failures(&self, key: &SessionKey) -> u32 {
        self.sessions
            .get(key)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0)
    }

    pub fn last_error(&self, key: &SessionKey) -> Option<String> {
        self.sessions.get(key).and_then(|s| s.last_error.clone())
    }

    /// Failures since the last success of any session
    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub fn last_ping(&self, key: &SessionKey) -> Option<Instant> {
        self.sessions.get(key).and_then(|s| s.last_ping)
    }

    /// Record a ping attempt; an older instant never replaces a newer one
    pub fn mark_ping(&self, key: &SessionKey, at: Instant) {
        let mut entry = self.sessions.entry(key.clone()).or_default();
        if entry.last_ping.is_none_or(|last| at > last) {
            entry.last_ping = Some(at);
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot {
            latest: self.latest(),
            total_failures: self.total_failures(),
            ..Default::default()
        };

        for session in self.sessions.iter() {
            match session.state {
                ConnectionState::Connected => snapshot.connected += 1,
                ConnectionState::Disconnected => snapshot.disconnected += 1,
                ConnectionState::NoConnection => snapshot.none += 1,
            }
        }

        snapshot
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
