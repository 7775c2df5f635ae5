use serde_json::Value;
use uuid::Uuid;

use super::{AccountInfo, ProxyEndpoint};

/// Identity of one (token, proxy) pipeline
///
/// The token never appears in `Debug` or `Display` output; only its
/// fingerprint does.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    token: String,
    proxy: ProxyEndpoint,
}

impl SessionKey {
    pub fn new(token: impl Into<String>, proxy: ProxyEndpoint) -> Self {
        Self {
            token: token.into(),
            proxy,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn proxy(&self) -> &ProxyEndpoint {
        &self.proxy
    }

    /// Last six characters of the token
    pub fn fingerprint(&self) -> String {
        token_fingerprint(&self.token)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("token", &self.fingerprint())
            .field("proxy", &self.proxy.to_string())
            .finish()
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.proxy, self.fingerprint())
    }
}

pub fn token_fingerprint(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let start = chars.len().saturating_sub(6);
    format!("…{}", chars[start..].iter().collect::<String>())
}

/// An established session for one (token, proxy) pair
#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    pub account: AccountInfo,
    pub browser_id: Uuid,
}

impl Session {
    pub fn new(key: SessionKey, account: AccountInfo, browser_id: Uuid) -> Self {
        Self {
            key,
            account,
            browser_id,
        }
    }

    pub fn uid(&self) -> Option<&Value> {
        self.account.uid()
    }

    /// Drop the account fields after the service revoked the session
    pub fn logout(&mut self) {
        self.account.clear();
    }
}
