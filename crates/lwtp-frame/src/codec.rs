use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::{crc16, CRC_SIZE};
use crate::error::{FrameError, Result};

/// Default frame marker byte.
pub const DEFAULT_MARKER: u8 = 0xE1;

/// Default receive buffer bound: 1 KiB.
pub const DEFAULT_RX_BUFFER_SIZE: usize = 1024;

/// Default transmit buffer bound: 1 KiB.
pub const DEFAULT_TX_BUFFER_SIZE: usize = 1024;

/// Size of the marker field.
pub const MARKER_SIZE: usize = 1;

/// Size of the big-endian length field in both frame kinds.
pub const LENGTH_SIZE: usize = 2;

/// Offset of the length field in a request frame.
pub const REQUEST_LENGTH_OFFSET: usize = 2;

/// Request header: marker (1) + command (1) + length (2) = 4 bytes.
pub const REQUEST_HEADER_SIZE: usize = REQUEST_LENGTH_OFFSET + LENGTH_SIZE;

/// Bytes a request frame carries besides its payload.
pub const REQUEST_OVERHEAD: usize = REQUEST_HEADER_SIZE + CRC_SIZE;

/// Response header: marker (1) + command (1) + status (1) + error code (1) + length (2) = 6 bytes.
pub const RESPONSE_HEADER_SIZE: usize = 6;

/// Bytes a response frame carries besides its payload.
pub const RESPONSE_OVERHEAD: usize = RESPONSE_HEADER_SIZE + CRC_SIZE;

/// Largest payload the 16-bit length field can describe.
pub const MAX_WIRE_PAYLOAD: usize = u16::MAX as usize;

/// First error code available for handler-defined meanings.
pub const CUSTOM_ERROR_CODE_START: u8 = 20;

/// Response status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

/// An error-code byte outside the protocol-defined codes.
///
/// Only [`ErrorCode::from_u8`] and [`ErrorCode::custom`] build one, so the
/// byte always lies in the range of the variant that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeByte(u8);

impl CodeByte {
    pub fn get(self) -> u8 {
        self.0
    }
}

/// Response error code byte.
///
/// Codes 0-4 are defined by the protocol, 5-19 are reserved, and 20 and up
/// belong to the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    None,
    CommandUnknown,
    DataLength,
    DataValue,
    Internal,
    Reserved(CodeByte),
    Custom(CodeByte),
}

impl ErrorCode {
    /// A handler-defined code, or `None` if `code` is below the custom range.
    pub fn custom(code: u8) -> Option<Self> {
        (code >= CUSTOM_ERROR_CODE_START).then_some(Self::Custom(CodeByte(code)))
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::CommandUnknown,
            2 => Self::DataLength,
            3 => Self::DataValue,
            4 => Self::Internal,
            5..CUSTOM_ERROR_CODE_START => Self::Reserved(CodeByte(value)),
            _ => Self::Custom(CodeByte(value)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::CommandUnknown => 1,
            Self::DataLength => 2,
            Self::DataValue => 3,
            Self::Internal => 4,
            Self::Reserved(code) | Self::Custom(code) => code.get(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::CommandUnknown => "COMMAND_UNKNOWN",
            Self::DataLength => "DATA_LENGTH",
            Self::DataValue => "DATA_VALUE",
            Self::Internal => "INTERNAL",
            Self::Reserved(_) => "RESERVED",
            Self::Custom(_) => "CUSTOM",
        }
    }
}

/// A decoded request, borrowed from the decoder's receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame<'a> {
    /// Command id.
    pub command: u8,
    /// Request payload.
    pub payload: &'a [u8],
}

/// Fixed fields of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Echoed command id.
    pub command: u8,
    pub status: Status,
    pub error_code: ErrorCode,
}

/// A response frame decoded on the client side.
#[derive(Debug, Clone)]
pub struct ResponseFrame {
    pub header: ResponseHeader,
    pub payload: Bytes,
}

impl ResponseFrame {
    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        RESPONSE_OVERHEAD + self.payload.len()
    }
}

/// Configuration for the frame decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Marker byte that opens every frame. Default: `0xE1`.
    pub marker: u8,
    /// Receive buffer bound in bytes, including header and checksum. Default: 1 KiB.
    pub rx_buffer_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
            rx_buffer_size: DEFAULT_RX_BUFFER_SIZE,
        }
    }
}

/// Encode a request frame.
///
/// Wire format:
/// ```text
/// ┌────────┬─────────┬──────────┬──────────────┬──────────┐
/// │ Marker │ Command │ Length   │ Payload      │ CRC16    │
/// │ (1B)   │ (1B)    │ (2B BE)  │ (Length B)   │ (2B BE)  │
/// └────────┴─────────┴──────────┴──────────────┴──────────┘
/// ```
pub fn encode_request(marker: u8, command: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = wire_length(payload.len())?;
    let start = dst.len();
    dst.reserve(REQUEST_OVERHEAD + payload.len());
    dst.put_u8(marker);
    dst.put_u8(command);
    dst.put_u16(len);
    dst.put_slice(payload);
    let crc = crc16(&dst[start..]);
    dst.put_u16(crc);
    Ok(())
}

/// Encode a response frame.
///
/// Wire format:
/// ```text
/// ┌────────┬─────────┬────────┬───────┬──────────┬────────────┬──────────┐
/// │ Marker │ Command │ Status │ Error │ Length   │ Payload    │ CRC16    │
/// │ (1B)   │ (1B)    │ (1B)   │ (1B)  │ (2B BE)  │ (Length B) │ (2B BE)  │
/// └────────┴─────────┴────────┴───────┴──────────┴────────────┴──────────┘
/// ```
pub fn encode_response(
    marker: u8,
    header: &ResponseHeader,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    wire_length(payload.len())?;
    let start = dst.len();
    dst.resize(start + RESPONSE_OVERHEAD + payload.len(), 0);
    dst[start + RESPONSE_HEADER_SIZE..start + RESPONSE_HEADER_SIZE + payload.len()]
        .copy_from_slice(payload);
    write_response_in_place(&mut dst[start..], marker, header, payload.len())?;
    Ok(())
}

/// Finish a response frame whose payload already sits at
/// `buf[RESPONSE_HEADER_SIZE..RESPONSE_HEADER_SIZE + payload_len]`.
///
/// Writes the header in front of the payload and the checksum behind it, and
/// returns the total frame length.
pub fn write_response_in_place(
    buf: &mut [u8],
    marker: u8,
    header: &ResponseHeader,
    payload_len: usize,
) -> Result<usize> {
    let len = wire_length(payload_len)?;
    let crc_offset = RESPONSE_HEADER_SIZE + payload_len;
    let total = crc_offset + CRC_SIZE;
    if buf.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            capacity: buf.len(),
        });
    }

    buf[0] = marker;
    buf[1] = header.command;
    buf[2] = header.status.as_u8();
    buf[3] = header.error_code.as_u8();
    buf[4..RESPONSE_HEADER_SIZE].copy_from_slice(&len.to_be_bytes());
    let crc = crc16(&buf[..crc_offset]);
    buf[crc_offset..total].copy_from_slice(&crc.to_be_bytes());
    Ok(total)
}

/// Decode a response frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_response(src: &mut BytesMut, marker: u8) -> Result<Option<ResponseFrame>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    if first != marker {
        return Err(FrameError::InvalidMarker {
            expected: marker,
            found: first,
        });
    }
    if src.len() < RESPONSE_HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let payload_len = usize::from(u16::from_be_bytes([src[4], src[5]]));
    let total = RESPONSE_OVERHEAD + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let crc_offset = total - CRC_SIZE;
    let received = u16::from_be_bytes([src[crc_offset], src[crc_offset + 1]]);
    let expected = crc16(&src[..crc_offset]);
    if received != expected {
        return Err(FrameError::ChecksumMismatch { expected, received });
    }

    let status = Status::from_u8(src[2]).ok_or(FrameError::InvalidStatus(src[2]))?;
    let header = ResponseHeader {
        command: src[1],
        status,
        error_code: ErrorCode::from_u8(src[3]),
    };

    src.advance(RESPONSE_HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(CRC_SIZE);

    Ok(Some(ResponseFrame { header, payload }))
}

fn wire_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: MAX_WIRE_PAYLOAD,
    })
}
