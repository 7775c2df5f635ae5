use serde::{Deserialize, Serialize};

/// Connection state of a session as seen by the ping loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    #[default]
    #[serde(rename = "none")]
    NoConnection,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::NoConnection => "none",
        }
    }

    /// Numeric form used by the service (1, 2, 3)
    pub fn code(&self) -> u8 {
        match self {
            ConnectionState::Connected => 1,
            ConnectionState::Disconnected => 2,
            ConnectionState::NoConnection => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ConnectionState::Connected),
            2 => Some(ConnectionState::Disconnected),
            3 => Some(ConnectionState::NoConnection),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
