use url::Url;

use crate::error::{KeepAliveError, Result};

/// Proxy protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
    Socks5h,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
            ProxyProtocol::Socks5h => "socks5h",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks5" => Some(ProxyProtocol::Socks5),
            "socks5h" => Some(ProxyProtocol::Socks5h),
            _ => None,
        }
    }

    pub fn is_socks(&self) -> bool {
        matches!(self, ProxyProtocol::Socks5 | ProxyProtocol::Socks5h)
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ProxyProtocol::Http => 80,
            ProxyProtocol::Https => 443,
            ProxyProtocol::Socks5 | ProxyProtocol::Socks5h => 1080,
        }
    }
}

impl std::fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proxy line from the proxies file, parsed and normalized
///
/// Lines without a scheme (`host:port`, `user:pass@host:port`) are taken
/// as HTTP proxies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    url: Url,
    protocol: ProxyProtocol,
}

impl ProxyEndpoint {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(KeepAliveError::InvalidProxy("empty proxy line".into()));
        }

        let url = if line.contains("://") {
            Url::parse(line)?
        } else {
            Url::parse(&format!("http://{}", line))?
        };

        let protocol = ProxyProtocol::from_str(url.scheme()).ok_or_else(|| {
            KeepAliveError::InvalidProxy(format!("unsupported scheme: {}", url.scheme()))
        })?;

        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => {
                return Err(KeepAliveError::InvalidProxy(format!(
                    "missing host in {}",
                    redact(line)
                )))
            }
        }

        if !(url.path().is_empty() || url.path() == "/") || url.query().is_some() {
            return Err(KeepAliveError::InvalidProxy(format!(
                "proxy must not carry a path or query: {}",
                redact(line)
            )));
        }

        Ok(Self { url, protocol })
    }

    pub fn protocol(&self) -> ProxyProtocol {
        self.protocol
    }

    /// Full proxy URI including credentials, for the HTTP client only
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url
            .port()
            .unwrap_or_else(|| self.protocol.default_port())
    }

    pub fn username(&self) -> Option<&str> {
        match self.url.username() {
            "" => None,
            user => Some(user),
        }
    }

    /// `user@host:port` form with the password left out, used in logs
    pub fn address(&self) -> String {
        match self.username() {
            Some(user) => format!("{}@{}:{}", user, self.host(), self.port()),
            None => format!("{}:{}", self.host(), self.port()),
        }
    }
}

impl std::fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.protocol, self.address())
    }
}

fn redact(line: &str) -> String {
    match line.rsplit_once('@') {
        Some((_, host)) => format!("***@{}", host),
        None => line.to_string(),
    }
}
