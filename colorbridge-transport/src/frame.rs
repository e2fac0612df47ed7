//! Paced, CRC-checked frame exchange
//!
//! ```text
//! write:  [setter opcode] [payload LE ...] [crc8(opcode, payload)]
//! read:  [getter opcode]  ->  [payload LE ...] [crc8(opcode, payload)]
//! ```
//!
//! Every byte, in either direction, is followed by [`timing::BYTE_DELAY`].
//! Input left over from an earlier exchange is discarded before each getter,
//! so a late or surplus byte costs at most one frame.
//! No retries happen here; callers decide what a checksum error means.

use std::time::Duration;

use tracing::{debug, trace};

use crate::crc;
use crate::error::TransportError;
use crate::link::BoxedLink;
use crate::protocol::{timing, MAX_WIDTH};

/// Frame-level access to the board
pub struct Bus {
    link: BoxedLink,
    byte_delay: Duration,
}

impl Bus {
    /// Create a bus over `link` with the firmware's byte pacing
    pub fn new(link: BoxedLink) -> Self {
        Self::with_byte_delay(link, timing::BYTE_DELAY)
    }

    /// Create a bus with custom pacing
    pub fn with_byte_delay(link: BoxedLink, byte_delay: Duration) -> Self {
        Self { link, byte_delay }
    }

    /// Description of the underlying link
    pub fn describe(&self) -> String {
        self.link.describe()
    }

    async fn put(&mut self, byte: u8) -> Result<(), TransportError> {
        self.link.write_byte(byte).await?;
        pace(self.byte_delay).await;
        Ok(())
    }

    async fn get(&mut self) -> Result<u8, TransportError> {
        let byte = self.link.read_byte().await?;
        pace(self.byte_delay).await;
        Ok(byte)
    }

    /// Write `opcode` followed by `payload`
    pub async fn write_frame(&mut self, opcode: u8, payload: &[u8]) -> Result<(), TransportError> {
        trace!("write frame 0x{:02X} {:02X?}", opcode, payload);
        self.put(opcode).await?;
        for &byte in payload {
            self.put(byte).await?;
        }
        Ok(())
    }

    /// Write `opcode`, `payload` and the frame's CRC byte
    pub async fn write_checked(&mut self, opcode: u8, payload: &[u8]) -> Result<(), TransportError> {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.extend_from_slice(payload);
        bytes.push(crc::frame_crc(opcode, payload));
        self.write_frame(opcode, &bytes).await
    }

    /// Issue getter `opcode` and read a `width`-byte payload plus CRC
    pub async fn read_frame(&mut self, opcode: u8, width: usize) -> Result<Vec<u8>, TransportError> {
        self.link.discard_input().await?;
        self.put(opcode).await?;

        let mut payload = Vec::with_capacity(width);
        for _ in 0..width {
            payload.push(self.get().await?);
        }
        let actual = self.get().await?;
        let expected = crc::frame_crc(opcode, &payload);

        if actual != expected {
            debug!(
                "CRC mismatch on 0x{:02X}: payload {:02X?}, expected 0x{:02X}, got 0x{:02X}",
                opcode, payload, expected, actual
            );
            return Err(TransportError::Checksum { expected, actual });
        }

        trace!("read frame 0x{:02X} {:02X?}", opcode, payload);
        Ok(payload)
    }

    /// Bring the board's frame parser back to an idle state
    ///
    /// A board left waiting for payload bytes consumes the zero padding; any
    /// stray replies it produces are discarded afterwards.
    pub async fn resync(&mut self) -> Result<(), TransportError> {
        self.link.discard_input().await?;
        for _ in 0..=MAX_WIDTH {
            self.put(0x00).await?;
        }
        self.link.discard_input().await?;
        debug!("Bus resynchronized on {}", self.link.describe());
        Ok(())
    }
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLink;

    fn bus(mock: &MockLink) -> Bus {
        Bus::with_byte_delay(Box::new(mock.clone()), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_write_frame_bytes() {
        let mock = MockLink::new();
        let mut bus = bus(&mock);
        bus.write_frame(0xC3, &[0x01, 0x02, 0x03, 0x04]).await.unwrap();
        assert_eq!(mock.written(), vec![0xC3, 0x01, 0x02, 0x03, 0x04]);
    }

    #[tokio::test]
    async fn test_write_checked_appends_crc() {
        let mock = MockLink::new();
        let mut bus = bus(&mock);
        bus.write_checked(0x43, &[0x10, 0x27]).await.unwrap();
        assert_eq!(mock.written(), vec![0x43, 0x10, 0x27, 0x99]);
    }

    #[tokio::test]
    async fn test_read_frame_ok() {
        let mock = MockLink::new();
        mock.push_reply(0x01, &[0x34, 0x21]);
        let mut bus = bus(&mock);
        let payload = bus.read_frame(0x01, 2).await.unwrap();
        assert_eq!(payload, vec![0x34, 0x21]);
        assert_eq!(mock.written(), vec![0x01]);
    }

    #[tokio::test]
    async fn test_read_frame_checksum_mismatch() {
        let mock = MockLink::new();
        mock.push_corrupt_reply(0x01, &[0x34, 0x21]);
        let mut bus = bus(&mock);
        let err = bus.read_frame(0x01, 2).await.unwrap_err();
        assert!(matches!(err, TransportError::Checksum { .. }));
        assert_eq!(mock.pending_reads(), 0);
    }

    #[tokio::test]
    async fn test_read_frame_link_error() {
        let mock = MockLink::new();
        mock.push_bytes(&[0x34]);
        let mut bus = bus(&mock);
        let err = bus.read_frame(0x01, 2).await.unwrap_err();
        assert!(err.is_link());
    }

    #[tokio::test]
    async fn test_read_frame_drops_stale_input() {
        let mock = MockLink::new();
        mock.push_stale(&[0x55]);
        mock.push_reply(0x01, &[0x34, 0x21]);
        mock.push_reply(0x01, &[0x35, 0x21]);
        let mut bus = bus(&mock);

        assert_eq!(bus.read_frame(0x01, 2).await.unwrap(), vec![0x34, 0x21]);
        assert_eq!(bus.read_frame(0x01, 2).await.unwrap(), vec![0x35, 0x21]);
        assert_eq!(mock.discards(), 2);
    }

    #[tokio::test]
    async fn test_read_frame_recovers_after_late_byte() {
        let mock = MockLink::new();
        // Reply cut short by a timeout; its last byte shows up afterwards
        mock.push_bytes(&[0x34]);
        mock.push_failure();
        mock.push_stale(&[0x21]);
        mock.push_reply(0x01, &[0x36, 0x21]);
        let mut bus = bus(&mock);

        assert!(bus.read_frame(0x01, 2).await.unwrap_err().is_link());
        assert_eq!(bus.read_frame(0x01, 2).await.unwrap(), vec![0x36, 0x21]);
    }

    #[tokio::test]
    async fn test_resync_pads_and_discards() {
        let mock = MockLink::new();
        let mut bus = bus(&mock);
        bus.resync().await.unwrap();
        assert_eq!(mock.written(), vec![0u8; MAX_WIDTH + 1]);
        assert_eq!(mock.discards(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_byte_pacing() {
        let mock = MockLink::new();
        let mut bus = Bus::new(Box::new(mock.clone()));
        let start = tokio::time::Instant::now();
        bus.write_frame(0x83, &[0x10, 0x27]).await.unwrap();
        assert!(start.elapsed() >= timing::BYTE_DELAY * 3);
    }
}
