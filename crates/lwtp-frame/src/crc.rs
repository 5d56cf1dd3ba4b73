//! CRC-16/MODBUS checksum used by every LWTP frame.
//!
//! Reflected polynomial 0xA001, initial value 0xFFFF, no final XOR. The value
//! is transmitted big-endian in the last two bytes of a frame.

/// Size of the checksum trailer on the wire.
pub const CRC_SIZE: usize = 2;

const POLY: u16 = 0xA001;
const INIT: u16 = 0xFFFF;

static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the checksum of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(INIT, |crc, &b| {
        (crc >> 8) ^ TABLE[usize::from((crc ^ u16::from(b)) & 0x00FF)]
    })
}
