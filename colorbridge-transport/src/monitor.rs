//! MonitorLink middleware for tracing bus traffic
//!
//! Wraps any [`ByteLink`] and logs every byte passing through it, so the
//! CLI's `--monitor` flag can show exactly what went over the wire.
//!
//! ```ignore
//! let link = SerialLink::open("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
//! let bus = Bus::new(MonitorLink::wrap(Box::new(link)));
//! ```

use async_trait::async_trait;
use tracing::info;

use crate::error::TransportError;
use crate::link::{BoxedLink, ByteLink};

/// Link middleware that logs all traffic
pub struct MonitorLink {
    inner: BoxedLink,
}

impl MonitorLink {
    /// Wrap a link with monitoring
    pub fn wrap(inner: BoxedLink) -> BoxedLink {
        Box::new(Self { inner })
    }
}

#[async_trait]
impl ByteLink for MonitorLink {
    async fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        let result = self.inner.write_byte(byte).await;
        match &result {
            Ok(()) => info!(target: "bus", ">> {:02X}", byte),
            Err(e) => info!(target: "bus", ">> {:02X} failed: {}", byte, e),
        }
        result
    }

    async fn read_byte(&mut self) -> Result<u8, TransportError> {
        let result = self.inner.read_byte().await;
        match &result {
            Ok(byte) => info!(target: "bus", "<< {:02X}", byte),
            Err(e) => info!(target: "bus", "<< failed: {}", e),
        }
        result
    }

    async fn discard_input(&mut self) -> Result<(), TransportError> {
        info!(target: "bus", "-- discard input");
        self.inner.discard_input().await
    }

    fn describe(&self) -> String {
        format!("monitor({})", self.inner.describe())
    }
}
