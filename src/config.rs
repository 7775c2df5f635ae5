use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::client::caller::{CallerConfig, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_REFERER, DEFAULT_USER_AGENT};
use crate::error::{KeepAliveError, Result};
use crate::session::SessionCacheKind;

pub const DEFAULT_SESSION_URL: &str = "http://api.nodepay.ai/api/auth/session";

pub const DEFAULT_PING_URLS: &[&str] = &[
    "http://13.215.134.222/api/network/ping",
    "http://18.139.20.49/api/network/ping",
    "http://18.142.29.174/api/network/ping",
    "http://18.142.214.13/api/network/ping",
    "http://52.74.31.107/api/network/ping",
    "http://52.74.35.173/api/network/ping",
    "http://52.77.10.116/api/network/ping",
    "http://3.1.154.253/api/network/ping",
];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Input files
    pub files: FilesConfig,
    /// Remote service endpoints and HTTP settings
    pub service: ServiceConfig,
    /// Fan-out and ping loop settings
    pub runner: RunnerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct FilesConfig {
    /// Proxy list, one URI per line (default: proxies.txt)
    pub proxies: PathBuf,
    /// Bearer tokens, one per line (default: token.txt)
    pub tokens: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Session creation endpoint
    pub session_url: String,
    /// Ping endpoints, rotated round-robin
    pub ping_urls: Vec<String>,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
    /// User-Agent header sent with every call
    pub user_agent: String,
    /// Referer header; empty disables it
    pub referer: String,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Seconds between pings of one session
    pub ping_interval: u64,
    /// Concurrent pipelines per token
    pub workers: usize,
    /// Proxies scheduled per token and round
    pub max_proxies: usize,
    /// Seconds to wait before reloading the proxy list
    pub reload_delay: u64,
    /// Seconds between status reports
    pub status_interval: u64,
    /// Session cache backend
    pub session_cache: SessionCacheKind,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Config {
            files: FilesConfig {
                proxies: PathBuf::from(get_env_or("KEEPALIVE_PROXIES_FILE", "proxies.txt")),
                tokens: PathBuf::from(get_env_or("KEEPALIVE_TOKENS_FILE", "token.txt")),
            },
            service: ServiceConfig {
                session_url: get_env_or("KEEPALIVE_SESSION_URL", DEFAULT_SESSION_URL),
                ping_urls: parse_list(&get_env_or(
                    "KEEPALIVE_PING_URLS",
                    &DEFAULT_PING_URLS.join(","),
                )),
                request_timeout: parse_env("KEEPALIVE_REQUEST_TIMEOUT", 30)?,
                user_agent: get_env_or("KEEPALIVE_USER_AGENT", DEFAULT_USER_AGENT),
                referer: get_env_or("KEEPALIVE_REFERER", DEFAULT_REFERER),
            },
            runner: RunnerConfig {
                ping_interval: parse_env("KEEPALIVE_PING_INTERVAL", 10)?,
                workers: parse_env("KEEPALIVE_WORKERS", 100)?,
                max_proxies: parse_env("KEEPALIVE_MAX_PROXIES", 1000)?,
                reload_delay: parse_env("KEEPALIVE_RELOAD_DELAY", 10)?,
                status_interval: parse_env("KEEPALIVE_STATUS_INTERVAL", 60)?,
                session_cache: {
                    let raw = get_env_or("KEEPALIVE_SESSION_CACHE", "none");
                    SessionCacheKind::from_str(&raw).ok_or_else(|| {
                        KeepAliveError::InvalidConfig(format!(
                            "KEEPALIVE_SESSION_CACHE must be memory or none, got {}",
                            raw
                        ))
                    })?
                },
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runner cannot work with
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("KEEPALIVE_PING_INTERVAL", self.runner.ping_interval),
            ("KEEPALIVE_REQUEST_TIMEOUT", self.service.request_timeout),
            ("KEEPALIVE_STATUS_INTERVAL", self.runner.status_interval),
        ] {
            if value == 0 {
                return Err(KeepAliveError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.runner.workers == 0 || self.runner.max_proxies == 0 {
            return Err(KeepAliveError::InvalidConfig(
                "KEEPALIVE_WORKERS and KEEPALIVE_MAX_PROXIES must be greater than zero".into(),
            ));
        }

        if self.service.ping_urls.is_empty() {
            return Err(KeepAliveError::InvalidConfig(
                "KEEPALIVE_PING_URLS must list at least one endpoint".into(),
            ));
        }

        for url in std::iter::once(&self.service.session_url).chain(&self.service.ping_urls) {
            Url::parse(url).map_err(|e| {
                KeepAliveError::InvalidConfig(format!("invalid endpoint URL {}: {}", url, e))
            })?;
        }

        if !matches!(self.log.format.as_str(), "pretty" | "json") {
            return Err(KeepAliveError::InvalidConfig(format!(
                "LOG_FORMAT must be pretty or json, got {}",
                self.log.format
            )));
        }

        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.runner.ping_interval)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_secs(self.runner.reload_delay)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.runner.status_interval)
    }

    pub fn caller_config(&self) -> CallerConfig {
        CallerConfig {
            request_timeout: Duration::from_secs(self.service.request_timeout),
            user_agent: self.service.user_agent.clone(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            referer: match self.service.referer.trim() {
                "" => None,
                referer => Some(referer.to_string()),
            },
        }
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            KeepAliveError::InvalidConfig(format!("{} must be a valid number, got {}", key, raw))
        }),
        _ => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
