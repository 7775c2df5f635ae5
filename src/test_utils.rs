//! Shared fixtures for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ApiCaller;
use crate::error::Result;
use crate::models::{Envelope, ProxyEndpoint};

pub(crate) const SESSION_URL: &str = "http://api.test/api/auth/session";

pub(crate) fn ping_endpoints(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("http://10.1.0.{}/api/network/ping", i + 1))
        .collect()
}

pub(crate) fn proxy(line: &str) -> ProxyEndpoint {
    ProxyEndpoint::parse(line).unwrap()
}

pub(crate) fn envelope(value: Value) -> Result<Envelope> {
    Envelope::from_value(value)
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub url: String,
    pub body: Value,
    pub proxy: String,
    pub token: String,
    pub at: tokio::time::Instant,
}

type Responder = dyn Fn(&str, &Value, &ProxyEndpoint) -> Result<Envelope> + Send + Sync;

/// `ApiCaller` that answers from a closure and records every call
pub(crate) struct ScriptedCaller {
    respond: Box<Responder>,
    delay: Option<Duration>,
    calls: parking_lot::Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedCaller {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, &Value, &ProxyEndpoint) -> Result<Envelope> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: parking_lot::Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Session calls return `uid`, pings return `ping_code`
    pub(crate) fn with_uid(uid: &'static str, ping_code: i64) -> Self {
        Self::new(move |url, _, _| {
            if url == SESSION_URL {
                envelope(serde_json::json!({"code": 0, "data": {"uid": uid}}))
            } else {
                envelope(serde_json::json!({"code": ping_code}))
            }
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn ping_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.url != SESSION_URL)
            .collect()
    }

    pub(crate) fn session_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.url == SESSION_URL).count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiCaller for ScriptedCaller {
    async fn call(
        &self,
        url: &str,
        body: &Value,
        proxy: &ProxyEndpoint,
        token: &str,
    ) -> Result<Envelope> {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            body: body.clone(),
            proxy: proxy.address(),
            token: token.to_string(),
            at: tokio::time::Instant::now(),
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = (self.respond)(url, body, proxy);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
