//! Single POST calls against the remote service
//!
//! Every call goes through the proxy of the session making it and is
//! validated against the `{code, data}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{KeepAliveError, Result};
use crate::models::{Envelope, ProxyEndpoint};

/// Performs one API call and validates the response envelope
///
/// Implementations must not retry; the ping loop decides what a failure
/// means.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    async fn call(
        &self,
        url: &str,
        body: &Value,
        proxy: &ProxyEndpoint,
        token: &str,
    ) -> Result<Envelope>;
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
pub const DEFAULT_REFERER: &str = "https://app.nodepay.ai";

/// HTTP client settings shared by every proxy
#[derive(Debug, Clone)]
pub struct CallerConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    /// Sent as `Referer` when set
    pub referer: Option<String>,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
        }
    }
}

/// `ApiCaller` backed by reqwest
///
/// reqwest binds proxies per client, so one client is built lazily for
/// each proxy and reused for all of its calls.
pub struct HttpApiCaller {
    config: CallerConfig,
    clients: DashMap<ProxyEndpoint, Client>,
}

impl HttpApiCaller {
    pub fn new(config: CallerConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    fn client_for(&self, proxy: &ProxyEndpoint) -> Result<Client> {
        if let Some(client) = self.clients.get(proxy) {
            return Ok(client.clone());
        }

        let upstream = reqwest::Proxy::all(proxy.url().as_str())
            .map_err(|e| KeepAliveError::InvalidProxy(format!("{}: {}", proxy, e)))?;

        let client = Client::builder()
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.request_timeout.min(Duration::from_secs(10)))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(self.config.user_agent.as_str())
            .proxy(upstream)
            .build()
            .map_err(|e| KeepAliveError::Internal(format!("failed to build HTTP client: {}", e)))?;

        debug!("Built HTTP client for proxy {}", proxy);
        self.clients.insert(proxy.clone(), client.clone());
        Ok(client)
    }

    /// Number of proxies with a cached client
    pub fn cached_clients(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl ApiCaller for HttpApiCaller {
    #[instrument(skip(self, body, proxy, token), fields(proxy = %proxy))]
    async fn call(
        &self,
        url: &str,
        body: &Value,
        proxy: &ProxyEndpoint,
        token: &str,
    ) -> Result<Envelope> {
        let client = self.client_for(proxy)?;

        let mut request = client
            .post(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, self.config.accept_language.as_str())
            .json(body);
        if let Some(referer) = &self.config.referer {
            request = request.header(REFERER, referer.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| KeepAliveError::Transport(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeepAliveError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| KeepAliveError::InvalidResponse(format!("{}: {}", url, e)))?;

        Envelope::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    // Acts as an HTTP proxy: reqwest sends absolute-form requests to it and
    // the router matches on the path.
    async fn spawn_proxy(app: Router) -> ProxyEndpoint {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ProxyEndpoint::parse(&format!("http://{}", addr)).unwrap()
    }

    async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Json(json!({"code": 0, "data": {
            "auth": auth,
            "agent": header("user-agent"),
            "language": header("accept-language"),
            "referer": header("referer"),
            "body": body,
        }}))
    }

    fn caller() -> HttpApiCaller {
        HttpApiCaller::new(CallerConfig {
            request_timeout: Duration::from_secs(5),
            user_agent: "keepalive-test".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_call_sends_bearer_token_and_json_body() {
        let proxy = spawn_proxy(Router::new().route("/api/network/ping", post(echo))).await;
        let caller = caller();

        let envelope = caller
            .call(
                "http://keepalive.test/api/network/ping",
                &json!({"id": "u1", "timestamp": 1}),
                &proxy,
                "tok-1",
            )
            .await
            .unwrap();

        assert!(envelope.is_success());
        assert_eq!(envelope.data["auth"], "Bearer tok-1");
        assert_eq!(envelope.data["agent"], "keepalive-test");
        assert_eq!(envelope.data["language"], DEFAULT_ACCEPT_LANGUAGE);
        assert_eq!(envelope.data["referer"], DEFAULT_REFERER);
        assert_eq!(envelope.data["body"]["id"], "u1");
        assert_eq!(caller.cached_clients(), 1);
    }

    #[tokio::test]
    async fn test_call_default_headers_look_like_a_browser() {
        let proxy = spawn_proxy(Router::new().route("/api/network/ping", post(echo))).await;
        let caller = HttpApiCaller::new(CallerConfig {
            referer: None,
            ..Default::default()
        });

        let envelope = caller
            .call("http://keepalive.test/api/network/ping", &json!({}), &proxy, "t")
            .await
            .unwrap();

        assert_eq!(envelope.data["agent"], DEFAULT_USER_AGENT);
        assert!(envelope.data["agent"].as_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(envelope.data["referer"], "");
    }

    #[tokio::test]
    async fn test_call_reuses_client_per_proxy() {
        let proxy = spawn_proxy(Router::new().route("/api/network/ping", post(echo))).await;
        let caller = caller();

        for _ in 0..3 {
            caller
                .call("http://keepalive.test/api/network/ping", &json!({}), &proxy, "t")
                .await
                .unwrap();
        }
        assert_eq!(caller.cached_clients(), 1);
    }

    #[tokio::test]
    async fn test_call_http_error_status() {
        let app = Router::new().route(
            "/api/network/ping",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let proxy = spawn_proxy(app).await;

        let err = caller()
            .call("http://keepalive.test/api/network/ping", &json!({}), &proxy, "t")
            .await
            .unwrap_err();
        assert!(matches!(err, KeepAliveError::HttpStatus { status: 502 }));
    }

    #[tokio::test]
    async fn test_call_rejects_non_json_and_negative_code() {
        let app = Router::new()
            .route("/text", post(|| async { "pong" }))
            .route("/negative", post(|| async { Json(json!({"code": -1})) }));
        let proxy = spawn_proxy(app).await;
        let caller = caller();

        let err = caller
            .call("http://keepalive.test/text", &json!({}), &proxy, "t")
            .await
            .unwrap_err();
        assert!(matches!(err, KeepAliveError::InvalidResponse(_)));

        let err = caller
            .call("http://keepalive.test/negative", &json!({}), &proxy, "t")
            .await
            .unwrap_err();
        assert!(matches!(err, KeepAliveError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_call_logout_code_is_returned_not_raised() {
        let app = Router::new().route(
            "/api/network/ping",
            post(|| async { Json(json!({"code": 403, "msg": "expired"})) }),
        );
        let proxy = spawn_proxy(app).await;

        let envelope = caller()
            .call("http://keepalive.test/api/network/ping", &json!({}), &proxy, "t")
            .await
            .unwrap();
        assert!(envelope.is_logout());
    }

    #[tokio::test]
    async fn test_call_unreachable_proxy_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let proxy = ProxyEndpoint::parse(&format!("http://{}", addr)).unwrap();

        let err = caller()
            .call("http://keepalive.test/api/network/ping", &json!({}), &proxy, "t")
            .await
            .unwrap_err();
        assert!(matches!(err, KeepAliveError::Transport(_)));
    }
}
