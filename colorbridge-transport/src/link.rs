//! Byte-level link abstraction

use async_trait::async_trait;

use crate::error::TransportError;

/// A half-duplex byte link to the board
///
/// Implementations move single bytes; pacing, framing and checksums live in
/// [`crate::Bus`]. Any error returned here is treated as a link failure.
#[async_trait]
pub trait ByteLink: Send {
    /// Write one byte
    async fn write_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Read one byte, failing if the board does not answer in time
    async fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// Drop anything already buffered on the receive side
    async fn discard_input(&mut self) -> Result<(), TransportError>;

    /// Short description for logs (port path, "mock", ...)
    fn describe(&self) -> String;
}

/// Type alias for a boxed link
pub type BoxedLink = Box<dyn ByteLink>;
