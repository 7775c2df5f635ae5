//! Keepalive - Multi-account session keep-alive client
//!
//! Keeps one authenticated session alive per (token, proxy) pair by sending
//! periodic heartbeats through each proxy.
//!
//! ## Features
//!
//! - HTTP, HTTPS and SOCKS5 proxy support
//! - Round-robin rotation over the ping endpoints
//! - Per-session connection state with a process-wide latest status
//! - Bounded concurrency per token with periodic proxy list reloads
//! - In-process session cache

pub mod client;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod ping;
pub mod services;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::{KeepAliveError, Result};
