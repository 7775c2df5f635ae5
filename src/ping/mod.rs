//! Heartbeats and connection state
//!
//! - `tracker`: per-session and process-wide connection state
//! - `ping_loop`: the throttled heartbeat loop for one session

pub mod ping_loop;
pub mod tracker;

pub use ping_loop::{LoopExit, PingLoop, TickResult};
pub use tracker::{ConnectionTracker, PingOutcome, StatusSnapshot};
