/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The byte at the start of a frame is not the protocol marker.
    #[error("invalid frame marker (expected 0x{expected:02X}, found 0x{found:02X})")]
    InvalidMarker { expected: u8, found: u8 },

    /// The declared payload length cannot fit the receive buffer.
    #[error("frame too long ({declared} byte payload, max {max})")]
    FrameTooLong { declared: usize, max: usize },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch (computed 0x{expected:04X}, received 0x{received:04X})")]
    ChecksumMismatch { expected: u16, received: u16 },

    /// Bytes were fed while a completed frame was still waiting to be taken.
    #[error("decoder holds a complete frame; reset before feeding more bytes")]
    FrameNotTaken,

    /// The destination buffer cannot hold the encoded frame.
    #[error("buffer too small ({needed} bytes needed, capacity {capacity})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A response frame carries a status byte other than OK or Error.
    #[error("invalid response status byte {0}")]
    InvalidStatus(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
