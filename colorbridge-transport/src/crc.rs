//! CRC-8 used by the board firmware
//!
//! Polynomial x^8 + x^2 + x + 1 (0x107, written 0x07 without the implicit
//! top bit), seed 0x00, no reflection, no final xor.

/// Generator polynomial without the x^8 term
pub const POLYNOMIAL: u8 = 0x07;

/// Initial register value
pub const SEED: u8 = 0x00;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Continue a running CRC over `data`
pub fn update(crc: u8, data: &[u8]) -> u8 {
    data.iter().fold(crc, |crc, &b| TABLE[(crc ^ b) as usize])
}

/// CRC of a frame: opcode followed by payload
pub fn frame_crc(opcode: u8, payload: &[u8]) -> u8 {
    update(update(SEED, &[opcode]), payload)
}

/// CRC of an arbitrary byte slice
pub fn checksum(data: &[u8]) -> u8 {
    update(SEED, data)
}
