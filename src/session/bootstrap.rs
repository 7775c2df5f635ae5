//! Session bootstrap for one (token, proxy) pair

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::cache::SessionCache;
use crate::client::ApiCaller;
use crate::error::Result;
use crate::models::{AccountInfo, Session, SessionKey};
use crate::ping::ConnectionTracker;

/// How a bootstrap ended
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    /// Reused a cached session
    Loaded(Session),
    /// Created a new session through the service
    Created(Session),
    /// The service returned no uid; the session is not usable
    LoggedOut,
}

impl BootstrapOutcome {
    pub fn into_session(self) -> Option<Session> {
        match self {
            BootstrapOutcome::Loaded(session) | BootstrapOutcome::Created(session) => {
                Some(session)
            }
            BootstrapOutcome::LoggedOut => None,
        }
    }
}

/// Establishes the account info a ping loop needs
pub struct SessionBootstrapper {
    caller: Arc<dyn ApiCaller>,
    cache: Arc<dyn SessionCache>,
    tracker: Arc<ConnectionTracker>,
    session_url: String,
}

impl SessionBootstrapper {
    pub fn new(
        caller: Arc<dyn ApiCaller>,
        cache: Arc<dyn SessionCache>,
        tracker: Arc<ConnectionTracker>,
        session_url: impl Into<String>,
    ) -> Self {
        Self {
            caller,
            cache,
            tracker,
            session_url: session_url.into(),
        }
    }

    /// Load a cached session or create one
    ///
    /// A fresh browser id is generated for every created session. Errors
    /// from the session call are returned unchanged.
    #[instrument(skip_all, fields(proxy = %key.proxy(), token = %key.fingerprint()))]
    pub async fn bootstrap(&self, key: SessionKey) -> Result<BootstrapOutcome> {
        if let Some(session) = self.cache.load(&key) {
            debug!("Using cached session");
            return Ok(BootstrapOutcome::Loaded(session));
        }

        let browser_id = Uuid::new_v4();
        let envelope = self
            .caller
            .call(&self.session_url, &json!({}), key.proxy(), key.token())
            .await?;

        let account = AccountInfo::from_data(envelope.data);
        let Some(uid) = account.uid().cloned() else {
            self.tracker.mark_logged_out(&key);
            self.cache.invalidate(&key);
            info!("Session response carried no uid, logged out");
            return Ok(BootstrapOutcome::LoggedOut);
        };

        let session = Session::new(key, account, browser_id);
        self.cache.save(&session);
        info!(
            uid = %uid,
            browser_id = %session.browser_id,
            "Session created"
        );

        Ok(BootstrapOutcome::Created(session))
    }
}
