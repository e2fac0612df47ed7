//! Transport layer for the colorbridge light/sensor board
//!
//! The board hangs off a half-duplex byte-serial link. This crate provides:
//!
//! - [`ByteLink`]: single-byte I/O, implemented by [`SerialLink`] (real
//!   hardware), [`MockLink`] (scripted) and [`MonitorLink`] (tracing wrapper)
//! - [`Bus`]: paced opcode/payload/CRC-8 frame exchange on top of a link
//! - [`protocol`]: opcode bit layout, widths and timing constants

pub mod crc;
pub mod error;
pub mod frame;
pub mod link;
pub mod mock;
pub mod monitor;
pub mod protocol;
pub mod serial;

pub use error::TransportError;
pub use frame::Bus;
pub use link::{BoxedLink, ByteLink};
pub use mock::MockLink;
pub use monitor::MonitorLink;
pub use protocol::Width;
pub use serial::{list_ports, PortCandidate, SerialLink, DEFAULT_BAUD_RATE};
