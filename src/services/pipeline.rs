//! Bootstrap → ping loop pipeline for one (token, proxy) pair

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::instrument;

use crate::client::{ApiCaller, EndpointRotator};
use crate::error::Result;
use crate::models::SessionKey;
use crate::ping::{ConnectionTracker, LoopExit, PingLoop};
use crate::session::{SessionBootstrapper, SessionCache};

/// How a pipeline ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineExit {
    /// The session endpoint returned no uid; nothing was pinged
    NoSession,
    /// A ping came back with the logout code
    LoggedOut,
    Shutdown,
}

/// Shared components every per-proxy pipeline runs against
pub struct ProxyPipeline {
    bootstrapper: SessionBootstrapper,
    ping_loop: PingLoop,
    cache: Arc<dyn SessionCache>,
}

impl ProxyPipeline {
    pub fn new(
        caller: Arc<dyn ApiCaller>,
        rotator: Arc<EndpointRotator>,
        tracker: Arc<ConnectionTracker>,
        cache: Arc<dyn SessionCache>,
        session_url: impl Into<String>,
        ping_interval: Duration,
    ) -> Self {
        Self {
            bootstrapper: SessionBootstrapper::new(
                caller.clone(),
                cache.clone(),
                tracker.clone(),
                session_url,
            ),
            ping_loop: PingLoop::new(caller, rotator, tracker, ping_interval),
            cache,
        }
    }

    /// Establish a session, then ping until logout or shutdown
    #[instrument(skip_all, fields(proxy = %key.proxy(), token = %key.fingerprint()))]
    pub async fn run(&self, key: SessionKey, mut shutdown: watch::Receiver<bool>) -> Result<PipelineExit> {
        let outcome = tokio::select! {
            outcome = self.bootstrapper.bootstrap(key.clone()) => outcome?,
            _ = shutdown.wait_for(|stop| *stop) => return Ok(PipelineExit::Shutdown),
        };

        let Some(session) = outcome.into_session() else {
            return Ok(PipelineExit::NoSession);
        };

        match self.ping_loop.run(session, shutdown).await {
            LoopExit::LoggedOut => {
                self.cache.invalidate(&key);
                Ok(PipelineExit::LoggedOut)
            }
            LoopExit::Shutdown => Ok(PipelineExit::Shutdown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeepAliveError;
    use crate::models::ConnectionState;
    use crate::session::MemorySessionCache;
    use crate::test_utils::{envelope, ping_endpoints, proxy, ScriptedCaller, SESSION_URL};
    use serde_json::json;

    fn pipeline(
        caller: Arc<ScriptedCaller>,
        cache: Arc<MemorySessionCache>,
    ) -> (ProxyPipeline, Arc<ConnectionTracker>) {
        let tracker = Arc::new(ConnectionTracker::new());
        let pipeline = ProxyPipeline::new(
            caller,
            Arc::new(EndpointRotator::new(ping_endpoints(2)).unwrap()),
            tracker.clone(),
            cache,
            SESSION_URL,
            Duration::from_secs(10),
        );
        (pipeline, tracker)
    }

    fn key() -> SessionKey {
        SessionKey::new("token-1", proxy("10.0.0.1:80"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_without_uid_never_pings() {
        let caller = Arc::new(ScriptedCaller::new(|_, _, _| {
            envelope(json!({"code": 0, "data": {}}))
        }));
        let (pipeline, tracker) = pipeline(caller.clone(), Arc::new(MemorySessionCache::new()));
        let (_tx, rx) = watch::channel(false);

        let exit = pipeline.run(key(), rx).await.unwrap();

        assert_eq!(exit, PipelineExit::NoSession);
        assert_eq!(tracker.status(&key()), ConnectionState::NoConnection);
        assert!(caller.ping_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_logout_invalidates_cached_session() {
        let caller = Arc::new(ScriptedCaller::with_uid("u1", 403));
        let cache = Arc::new(MemorySessionCache::new());
        let (pipeline, tracker) = pipeline(caller.clone(), cache.clone());
        let (_tx, rx) = watch::channel(false);

        let exit = pipeline.run(key(), rx).await.unwrap();

        assert_eq!(exit, PipelineExit::LoggedOut);
        assert!(cache.is_empty());
        assert_eq!(tracker.status(&key()), ConnectionState::NoConnection);
        assert_eq!(caller.ping_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_bootstrap_error_is_returned() {
        let caller = Arc::new(ScriptedCaller::new(|_, _, _| {
            Err(KeepAliveError::Transport("proxy refused".into()))
        }));
        let (pipeline, _) = pipeline(caller, Arc::new(MemorySessionCache::new()));
        let (_tx, rx) = watch::channel(false);

        let err = pipeline.run(key(), rx).await.unwrap_err();
        assert!(matches!(err, KeepAliveError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_shutdown_during_bootstrap() {
        let caller = Arc::new(
            ScriptedCaller::with_uid("u1", 0).with_delay(Duration::from_secs(60)),
        );
        let (pipeline, _) = pipeline(caller.clone(), Arc::new(MemorySessionCache::new()));
        let (tx, rx) = watch::channel(false);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
        });

        let exit = pipeline.run(key(), rx).await.unwrap();
        stopper.await.unwrap();

        assert_eq!(exit, PipelineExit::Shutdown);
        assert!(caller.ping_calls().is_empty());
    }
}
