use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the keep-alive client
#[derive(Error, Debug)]
pub enum KeepAliveError {
    // Input errors
    #[error("Failed to load {path}: {source}")]
    FileLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),

    // Remote API errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for keep-alive operations
pub type Result<T> = std::result::Result<T, KeepAliveError>;

impl KeepAliveError {
    /// Errors that end the process instead of a single pipeline
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KeepAliveError::FileLoad { .. } | KeepAliveError::InvalidConfig(_)
        )
    }
}

impl From<url::ParseError> for KeepAliveError {
    fn from(err: url::ParseError) -> Self {
        KeepAliveError::InvalidProxy(err.to_string())
    }
}
