//! Transport error types

use thiserror::Error;

/// Errors that can occur during bus operations
#[derive(Error, Debug)]
pub enum TransportError {
    /// The link failed; the board is unreachable (unplugged, port gone, no answer)
    #[error("Link error: {0}")]
    Link(String),

    /// A frame arrived but its trailing CRC did not match
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Checksum { expected: u8, actual: u8 },
}

impl TransportError {
    /// Whether this error means the board is physically unreachable
    pub fn is_link(&self) -> bool {
        matches!(self, TransportError::Link(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Link(e.to_string())
    }
}

impl From<serialport::Error> for TransportError {
    fn from(e: serialport::Error) -> Self {
        TransportError::Link(e.to_string())
    }
}
