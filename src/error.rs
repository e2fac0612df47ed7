//! Session error types

use thiserror::Error;

/// Errors raised by the upstream session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Upstream sent something that is not a valid message
    #[error("Malformed upstream message: {0}")]
    ProtocolDecode(String),

    /// Server clock and local clock disagree too much to trust timestamps
    #[error("Server time is off by {skew_ms} ms")]
    StaleTime { skew_ms: i64 },

    /// WebSocket connect, send or receive failed
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::ProtocolDecode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SessionError::WebSocket(e.to_string())
    }
}
