//! Protocol constants and opcode encoding for the board's byte bus
//!
//! Every exchange starts with one opcode byte. The two top bits select the
//! direction and the word width; the remaining bits carry the register id:
//!
//! ```text
//! 7 6 5 4 3 2 1 0
//! | | +-----------+-- register id (base opcode)
//! | +-------------- 1 = 4-byte word, 0 = 2-byte word
//! +---------------- 1 = setter, 0 = getter
//! ```

use std::time::Duration;

/// Opcode bit marking a setter
pub const SETTER_BIT: u8 = 0x80;

/// Opcode bit marking a 4-byte word
pub const WIDE_BIT: u8 = 0x40;

/// Bits left for the register id
pub const BASE_MASK: u8 = 0x3F;

/// Widest payload the firmware accepts (bytes)
pub const MAX_WIDTH: usize = 4;

/// Bus timing constants
pub mod timing {
    use super::Duration;

    /// Pause after every byte written or read; the firmware polls its
    /// UART at roughly this rate
    pub const BYTE_DELAY: Duration = Duration::from_millis(1);
}

/// Word width of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// 16-bit word
    Two,
    /// 32-bit word
    Four,
}

impl Width {
    /// Payload length in bytes
    pub const fn bytes(self) -> usize {
        match self {
            Width::Two => 2,
            Width::Four => 4,
        }
    }

    /// Largest raw value that fits the word
    pub const fn max_raw(self) -> u32 {
        match self {
            Width::Two => u16::MAX as u32,
            Width::Four => u32::MAX,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Width::Two => 0,
            Width::Four => WIDE_BIT,
        }
    }
}

/// Opcode that reads register `base`
pub const fn getter(base: u8, width: Width) -> u8 {
    (base & BASE_MASK) | width.bit()
}

/// Opcode that writes register `base`
pub const fn setter(base: u8, width: Width) -> u8 {
    (base & BASE_MASK) | width.bit() | SETTER_BIT
}

/// Split an opcode into (base, width, is_setter)
pub fn decode_opcode(opcode: u8) -> (u8, Width, bool) {
    let width = if opcode & WIDE_BIT != 0 {
        Width::Four
    } else {
        Width::Two
    };
    (opcode & BASE_MASK, width, opcode & SETTER_BIT != 0)
}

/// Little-endian pack of the low `width` bytes of `raw`
pub fn pack_le(raw: u32, width: Width) -> Vec<u8> {
    raw.to_le_bytes()[..width.bytes()].to_vec()
}

/// Little-endian unpack of a 2- or 4-byte payload
pub fn unpack_le(payload: &[u8]) -> u32 {
    payload
        .iter()
        .take(4)
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (8 * i))
}
