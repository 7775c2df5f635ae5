//! Fan-out of per-proxy pipelines for every token
//!
//! Each token gets its own driver task. A driver loads the proxy list,
//! runs one pipeline per usable proxy with bounded concurrency, and
//! reloads the list once every pipeline of the round has ended.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::pipeline::{PipelineExit, ProxyPipeline};
use crate::error::{KeepAliveError, Result};
use crate::loader::load_proxies;
use crate::models::{token_fingerprint, ProxyEndpoint, SessionKey};

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub proxies_file: PathBuf,
    /// Pipelines running at once per token
    pub workers: usize,
    /// Proxies scheduled per token and round
    pub max_proxies: usize,
    /// Pause between the end of a round and the next reload
    pub reload_delay: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            proxies_file: PathBuf::from("proxies.txt"),
            workers: 100,
            max_proxies: 1000,
            reload_delay: Duration::from_secs(10),
        }
    }
}

/// Tally of one round of pipelines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub scheduled: usize,
    pub invalid: usize,
    pub over_limit: usize,
    pub no_session: usize,
    pub logged_out: usize,
    pub shutdown: usize,
    pub failed: usize,
}

impl RoundReport {
    fn record(&mut self, key: &SessionKey, result: Result<PipelineExit>) {
        match result {
            Ok(PipelineExit::NoSession) => self.no_session += 1,
            Ok(PipelineExit::LoggedOut) => self.logged_out += 1,
            Ok(PipelineExit::Shutdown) => self.shutdown += 1,
            Err(e) => {
                self.failed += 1;
                warn!(
                    proxy = %key.proxy(),
                    token = %key.fingerprint(),
                    "Pipeline ended with error: {}",
                    e
                );
            }
        }
    }

    pub fn finished(&self) -> usize {
        self.no_session + self.logged_out + self.shutdown + self.failed
    }
}

/// Parse proxy lines, keep the usable ones, and cap the list
///
/// Returns the proxies to schedule, the number of unusable lines and the
/// number of usable proxies dropped by the cap.
pub fn select_proxies(lines: &[String], max_proxies: usize) -> (Vec<ProxyEndpoint>, usize, usize) {
    let mut invalid = 0;
    let mut usable = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        match ProxyEndpoint::parse(line) {
            Ok(proxy) => usable.push(proxy),
            Err(e) => {
                invalid += 1;
                warn!("Skipping proxy on line {}: {}", idx + 1, e);
            }
        }
    }

    let over_limit = usable.len().saturating_sub(max_proxies);
    usable.truncate(max_proxies);
    (usable, invalid, over_limit)
}

/// First driver result whose error must end the process
pub fn first_fatal(results: &[(String, Result<()>)]) -> Option<(&str, &KeepAliveError)> {
    results.iter().find_map(|(token, result)| match result {
        Err(e) if e.is_fatal() => Some((token.as_str(), e)),
        _ => None,
    })
}

/// Keeps one token's pipelines running across proxy list reloads
pub struct TokenDriver {
    token: String,
    pipeline: Arc<ProxyPipeline>,
    config: DriverConfig,
}

impl TokenDriver {
    pub fn new(token: impl Into<String>, pipeline: Arc<ProxyPipeline>, config: DriverConfig) -> Self {
        Self {
            token: token.into(),
            pipeline,
            config,
        }
    }

    /// Run rounds until the proxy list is empty or shutdown is signalled
    ///
    /// A proxy file that cannot be read stops this driver with the error.
    #[instrument(skip_all, fields(token = %token_fingerprint(&self.token)))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let lines = load_proxies(&self.config.proxies_file).await?;
            if lines.is_empty() {
                info!("Proxy list is empty, stopping driver");
                return Ok(());
            }

            let report = self.run_round(&lines, shutdown.clone()).await;
            info!(
                scheduled = report.scheduled,
                invalid = report.invalid,
                over_limit = report.over_limit,
                no_session = report.no_session,
                logged_out = report.logged_out,
                failed = report.failed,
                "Round finished"
            );

            tokio::select! {
                _ = sleep(self.config.reload_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run one pipeline per usable proxy, at most `workers` at a time
    pub async fn run_round(&self, lines: &[String], shutdown: watch::Receiver<bool>) -> RoundReport {
        let (proxies, invalid, over_limit) = select_proxies(lines, self.config.max_proxies);
        if over_limit > 0 {
            warn!(
                "{} proxies over the limit of {} were not scheduled",
                over_limit, self.config.max_proxies
            );
        }

        let initial = RoundReport {
            scheduled: proxies.len(),
            invalid,
            over_limit,
            ..Default::default()
        };
        info!("Starting {} pipelines", initial.scheduled);

        futures::stream::iter(proxies)
            .map(|proxy| {
                let key = SessionKey::new(self.token.clone(), proxy);
                let pipeline = self.pipeline.clone();
                let shutdown = shutdown.clone();
                async move {
                    let result = pipeline.run(key.clone(), shutdown).await;
                    (key, result)
                }
            })
            .buffer_unordered(self.config.workers.max(1))
            .fold(initial, |mut report, (key, result)| async move {
                report.record(&key, result);
                report
            })
            .await
    }
}

/// Spawns one `TokenDriver` per token and waits for all of them
pub struct FanOutDriver {
    tokens: Vec<String>,
    pipeline: Arc<ProxyPipeline>,
    config: DriverConfig,
}

impl FanOutDriver {
    pub fn new(tokens: Vec<String>, pipeline: Arc<ProxyPipeline>, config: DriverConfig) -> Self {
        Self {
            tokens,
            pipeline,
            config,
        }
    }

    /// Returns each token's fingerprint with how its driver ended
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Vec<(String, Result<()>)> {
        info!("Starting drivers for {} tokens", self.tokens.len());

        let handles: Vec<_> = self
            .tokens
            .into_iter()
            .map(|token| {
                let fingerprint = token_fingerprint(&token);
                let driver = TokenDriver::new(token, self.pipeline.clone(), self.config.clone());
                let shutdown = shutdown.clone();
                let handle = tokio::spawn(async move { driver.run(shutdown).await });
                (fingerprint, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (fingerprint, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(KeepAliveError::Internal(format!("driver task failed: {}", e))),
            };
            if let Err(e) = &result {
                error!(token = %fingerprint, "Driver stopped: {}", e);
            }
            results.push((fingerprint, result));
        }

        results
    }
}
