//! Keepalive - Entry Point
//!
//! Starts one driver per token plus the status reporter, with graceful
//! shutdown support.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use keepalive::client::{EndpointRotator, HttpApiCaller};
use keepalive::config::Config;
use keepalive::loader::{load_proxies, load_tokens};
use keepalive::ping::ConnectionTracker;
use keepalive::services::driver::first_fatal;
use keepalive::services::{DriverConfig, FanOutDriver, ProxyPipeline, ShutdownHandle, StatusReporter};
use keepalive::session::create_cache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(&config);

    info!("Starting keepalive {}", env!("CARGO_PKG_VERSION"));

    let tokens = load_tokens(&config.files.tokens)
        .await
        .context("Failed to load tokens")?;
    let proxies = load_proxies(&config.files.proxies)
        .await
        .context("Failed to load proxies")?;
    info!("Loaded {} tokens and {} proxies", tokens.len(), proxies.len());

    if tokens.is_empty() {
        warn!("No tokens found in {}", config.files.tokens.display());
        return Ok(());
    }

    let caller = Arc::new(HttpApiCaller::new(config.caller_config()));
    let rotator = Arc::new(
        EndpointRotator::new(config.service.ping_urls.clone()).context("Invalid ping endpoints")?,
    );
    let tracker = Arc::new(ConnectionTracker::new());
    let cache = create_cache(config.runner.session_cache);
    info!("Using session cache: {}", cache.name());

    let pipeline = Arc::new(ProxyPipeline::new(
        caller,
        rotator,
        tracker.clone(),
        cache,
        config.service.session_url.clone(),
        config.ping_interval(),
    ));

    let (shutdown, reporter_shutdown) = ShutdownHandle::new();

    let reporter = StatusReporter::new(tracker, config.status_interval());
    let reporter_task = tokio::spawn(async move {
        reporter.run(reporter_shutdown).await;
    });

    let driver = FanOutDriver::new(
        tokens,
        pipeline,
        DriverConfig {
            proxies_file: config.files.proxies.clone(),
            workers: config.runner.workers,
            max_proxies: config.runner.max_proxies,
            reload_delay: config.reload_delay(),
        },
    );
    let driver_shutdown = shutdown.subscribe();
    let mut driver_task = tokio::spawn(async move { driver.run(driver_shutdown).await });

    let finished = tokio::select! {
        results = &mut driver_task => Some(results),
        _ = shutdown_signal() => None,
    };
    let results = match finished {
        Some(results) => results,
        None => {
            info!("Shutdown signal received");
            shutdown.shutdown();
            driver_task.await
        }
    };

    shutdown.shutdown();
    let _ = reporter_task.await;

    let results = results.context("Driver task failed")?;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        error!("{} of {} drivers stopped with an error", failed, results.len());
    }
    if let Some((token, err)) = first_fatal(&results) {
        anyhow::bail!("Driver for token {} stopped: {}", token, err);
    }

    info!("Keepalive stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("keepalive={}", config.log.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.log.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
