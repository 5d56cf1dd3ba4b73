//! CRC-checked framing for the lightweight transfer protocol (LWTP).
//!
//! Every request is framed as:
//! - A 1-byte marker (`0xE1` by default) for stream synchronization
//! - A 1-byte command id
//! - A 2-byte big-endian payload length
//! - The payload, then a 2-byte big-endian CRC-16/MODBUS over everything before it
//!
//! Responses add a status byte and an error-code byte after the command id.
//! The [`FrameDecoder`] reassembles requests from arbitrarily fragmented input.

pub mod codec;
pub mod crc;
pub mod decoder;
pub mod error;

pub use codec::{
    decode_response, encode_request, encode_response, write_response_in_place, CodeByte, ErrorCode,
    FrameConfig, RequestFrame, ResponseFrame, ResponseHeader, Status, CUSTOM_ERROR_CODE_START,
    DEFAULT_MARKER, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TX_BUFFER_SIZE, MAX_WIRE_PAYLOAD,
    REQUEST_HEADER_SIZE, REQUEST_OVERHEAD, RESPONSE_HEADER_SIZE, RESPONSE_OVERHEAD,
};
pub use crc::{crc16, CRC_SIZE};
pub use decoder::{FrameDecoder, Phase, Progress};
pub use error::{FrameError, Result};
