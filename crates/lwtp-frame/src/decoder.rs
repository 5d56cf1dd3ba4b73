//! Resumable request-frame decoder.
//!
//! The decoder copies at most the bytes a chunk offers, so a frame may arrive
//! split across any number of calls, down to one byte at a time.

use tracing::{debug, trace};

use crate::codec::{
    FrameConfig, RequestFrame, MARKER_SIZE, REQUEST_HEADER_SIZE, REQUEST_LENGTH_OFFSET,
    REQUEST_OVERHEAD,
};
use crate::crc::{crc16, CRC_SIZE};
use crate::error::{FrameError, Result};

/// Reassembly phase. Phases only move forward; [`FrameDecoder::reset`] is the
/// only way back to [`Phase::AwaitMarker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitMarker,
    AwaitLength,
    AwaitPayload,
    AwaitChecksum,
    Complete,
}

/// Outcome of a successful [`FrameDecoder::feed`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// `n` bytes were consumed and the frame is still incomplete.
    Pending(usize),
    /// `n` bytes were consumed and a checksum-valid frame is buffered.
    Ready(usize),
}

impl Progress {
    pub fn consumed(self) -> usize {
        match self {
            Self::Pending(n) | Self::Ready(n) => n,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Per-session request-frame decoder backed by a fixed-capacity buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Box<[u8]>,
    marker: u8,
    phase: Phase,
    accumulated: usize,
    expected: usize,
}

impl FrameDecoder {
    /// Create a decoder whose receive buffer holds `config.rx_buffer_size` bytes.
    ///
    /// The buffer must at least fit an empty request frame.
    pub fn new(config: &FrameConfig) -> Result<Self> {
        if config.rx_buffer_size < REQUEST_OVERHEAD {
            return Err(FrameError::BufferTooSmall {
                needed: REQUEST_OVERHEAD,
                capacity: config.rx_buffer_size,
            });
        }
        Ok(Self {
            buf: vec![0u8; config.rx_buffer_size].into_boxed_slice(),
            marker: config.marker,
            phase: Phase::AwaitMarker,
            accumulated: 0,
            expected: MARKER_SIZE,
        })
    }

    /// Run one transition step over the front of `chunk`.
    ///
    /// Any error leaves the decoder back in [`Phase::AwaitMarker`]. Callers
    /// resynchronise by retrying one byte past the start of the failed chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Progress> {
        if self.phase == Phase::Complete {
            return Err(FrameError::FrameNotTaken);
        }
        let Some(&first) = chunk.first() else {
            return Ok(Progress::Pending(0));
        };

        match self.phase {
            Phase::AwaitMarker => {
                if first != self.marker {
                    trace!(byte = first, "skipping non-marker byte");
                    return Err(FrameError::InvalidMarker {
                        expected: self.marker,
                        found: first,
                    });
                }
                self.buf[0] = first;
                self.accumulated = MARKER_SIZE;
                self.expected = REQUEST_HEADER_SIZE - MARKER_SIZE;
                self.phase = Phase::AwaitLength;
                Ok(Progress::Pending(MARKER_SIZE))
            }
            Phase::AwaitLength => {
                let (taken, filled) = self.absorb(chunk);
                if filled {
                    let declared = usize::from(u16::from_be_bytes([
                        self.buf[REQUEST_LENGTH_OFFSET],
                        self.buf[REQUEST_LENGTH_OFFSET + 1],
                    ]));
                    let max = self.max_payload();
                    if declared > max {
                        debug!(declared, max, "declared payload exceeds receive buffer");
                        self.reset();
                        return Err(FrameError::FrameTooLong { declared, max });
                    }
                    if declared == 0 {
                        self.expected = CRC_SIZE;
                        self.phase = Phase::AwaitChecksum;
                    } else {
                        self.expected = declared;
                        self.phase = Phase::AwaitPayload;
                    }
                }
                Ok(Progress::Pending(taken))
            }
            Phase::AwaitPayload => {
                let (taken, filled) = self.absorb(chunk);
                if filled {
                    self.expected = CRC_SIZE;
                    self.phase = Phase::AwaitChecksum;
                }
                Ok(Progress::Pending(taken))
            }
            Phase::AwaitChecksum => {
                let (taken, filled) = self.absorb(chunk);
                if !filled {
                    return Ok(Progress::Pending(taken));
                }
                let crc_offset = self.accumulated - CRC_SIZE;
                let received =
                    u16::from_be_bytes([self.buf[crc_offset], self.buf[crc_offset + 1]]);
                let expected = crc16(&self.buf[..crc_offset]);
                if received != expected {
                    debug!(
                        expected = format_args!("0x{expected:04X}"),
                        received = format_args!("0x{received:04X}"),
                        "request checksum mismatch"
                    );
                    self.reset();
                    return Err(FrameError::ChecksumMismatch { expected, received });
                }
                self.phase = Phase::Complete;
                Ok(Progress::Ready(taken))
            }
            Phase::Complete => Err(FrameError::FrameNotTaken),
        }
    }

    /// The buffered frame, if reassembly reached [`Phase::Complete`].
    pub fn frame(&self) -> Option<RequestFrame<'_>> {
        if self.phase != Phase::Complete {
            return None;
        }
        Some(RequestFrame {
            command: self.buf[MARKER_SIZE],
            payload: &self.buf[REQUEST_HEADER_SIZE..self.accumulated - CRC_SIZE],
        })
    }

    /// Drop any partial or completed frame and wait for the next marker.
    pub fn reset(&mut self) {
        self.phase = Phase::AwaitMarker;
        self.accumulated = 0;
        self.expected = MARKER_SIZE;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Bytes of the current frame held in the receive buffer.
    pub fn buffered(&self) -> usize {
        self.accumulated
    }

    /// Bytes still missing before the current phase ends.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// True while no frame is being reassembled.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::AwaitMarker
    }

    /// Receive buffer bound in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Largest payload a request may declare.
    pub fn max_payload(&self) -> usize {
        self.buf.len() - REQUEST_OVERHEAD
    }

    pub fn marker(&self) -> u8 {
        self.marker
    }

    fn absorb(&mut self, chunk: &[u8]) -> (usize, bool) {
        let take = chunk.len().min(self.expected);
        self.buf[self.accumulated..self.accumulated + take].copy_from_slice(&chunk[..take]);
        self.accumulated += take;
        self.expected -= take;
        (take, self.expected == 0)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_request, DEFAULT_MARKER};

    fn decoder(rx_buffer_size: usize) -> FrameDecoder {
        FrameDecoder::new(&FrameConfig {
            rx_buffer_size,
            ..FrameConfig::default()
        })
        .unwrap()
    }

    fn request(command: u8, payload: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_request(DEFAULT_MARKER, command, payload, &mut wire).unwrap();
        wire.to_vec()
    }

    /// Feed `wire` in `step`-sized chunks, consuming each chunk fully.
    fn feed_in_chunks(dec: &mut FrameDecoder, wire: &[u8], step: usize) -> bool {
        for chunk in wire.chunks(step) {
            let mut pos = 0;
            while pos < chunk.len() {
                let progress = dec.feed(&chunk[pos..]).unwrap();
                pos += progress.consumed();
                if progress.is_ready() {
                    assert_eq!(pos, chunk.len());
                    return true;
                }
            }
        }
        false
    }

    #[test]
    fn rejects_buffer_smaller_than_empty_frame() {
        let err = FrameDecoder::new(&FrameConfig {
            rx_buffer_size: REQUEST_OVERHEAD - 1,
            ..FrameConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, FrameError::BufferTooSmall { .. }));
    }

    #[test]
    fn phases_advance_in_order() {
        let wire = request(0x21, b"xy");
        let mut dec = decoder(64);

        assert_eq!(dec.feed(&wire[..1]).unwrap(), Progress::Pending(1));
        assert_eq!(dec.phase(), Phase::AwaitLength);
        assert_eq!(dec.expected(), 3);

        assert_eq!(dec.feed(&wire[1..4]).unwrap(), Progress::Pending(3));
        assert_eq!(dec.phase(), Phase::AwaitPayload);
        assert_eq!(dec.expected(), 2);

        assert_eq!(dec.feed(&wire[4..6]).unwrap(), Progress::Pending(2));
        assert_eq!(dec.phase(), Phase::AwaitChecksum);
        assert_eq!(dec.expected(), CRC_SIZE);

        assert_eq!(dec.feed(&wire[6..]).unwrap(), Progress::Ready(2));
        assert_eq!(dec.phase(), Phase::Complete);
        assert_eq!(dec.buffered(), wire.len());
    }

    #[test]
    fn step_consumes_only_what_the_phase_needs() {
        let wire = request(0x01, b"payload");
        let mut dec = decoder(64);

        // Marker step looks at the first byte only.
        assert_eq!(dec.feed(&wire).unwrap(), Progress::Pending(1));
        // Command + length.
        assert_eq!(dec.feed(&wire[1..]).unwrap(), Progress::Pending(3));
        assert_eq!(dec.feed(&wire[4..]).unwrap(), Progress::Pending(7));
        assert_eq!(dec.feed(&wire[11..]).unwrap(), Progress::Ready(2));
    }

    #[test]
    fn fragmentation_schemes_yield_identical_frames() {
        let payload: Vec<u8> = (0..200u16).map(|i| (i * 7) as u8).collect();
        let wire = request(0x42, &payload);

        for step in [1, 2, 3, 5, 64, wire.len()] {
            let mut dec = decoder(256);
            assert!(feed_in_chunks(&mut dec, &wire, step), "step {step}");
            let frame = dec.frame().unwrap();
            assert_eq!(frame.command, 0x42, "step {step}");
            assert_eq!(frame.payload, payload.as_slice(), "step {step}");
        }
    }

    #[test]
    fn empty_payload_skips_payload_phase() {
        let wire = request(0x05, b"");
        let mut dec = decoder(16);

        dec.feed(&wire[..1]).unwrap();
        dec.feed(&wire[1..4]).unwrap();
        assert_eq!(dec.phase(), Phase::AwaitChecksum);
        assert!(dec.feed(&wire[4..]).unwrap().is_ready());

        let frame = dec.frame().unwrap();
        assert_eq!(frame.command, 0x05);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut dec = decoder(16);
        assert_eq!(dec.feed(&[]).unwrap(), Progress::Pending(0));
        assert!(dec.is_idle());

        dec.feed(&[DEFAULT_MARKER]).unwrap();
        assert_eq!(dec.feed(&[]).unwrap(), Progress::Pending(0));
        assert_eq!(dec.phase(), Phase::AwaitLength);
        assert_eq!(dec.buffered(), 1);
    }

    #[test]
    fn bad_marker_fails_without_buffering() {
        let mut dec = decoder(16);
        let err = dec.feed(&[0x00, DEFAULT_MARKER]).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidMarker {
                expected: DEFAULT_MARKER,
                found: 0x00,
            }
        );
        assert!(dec.is_idle());
        assert_eq!(dec.buffered(), 0);
    }

    #[test]
    fn custom_marker_is_honoured() {
        let mut dec = FrameDecoder::new(&FrameConfig {
            marker: 0x7E,
            rx_buffer_size: 32,
        })
        .unwrap();
        assert!(dec.feed(&[DEFAULT_MARKER]).is_err());
        assert_eq!(dec.feed(&[0x7E]).unwrap(), Progress::Pending(1));
        assert_eq!(dec.marker(), 0x7E);
    }

    #[test]
    fn oversized_declared_length_is_rejected_before_buffering() {
        let mut dec = decoder(32);
        assert_eq!(dec.max_payload(), 32 - REQUEST_OVERHEAD);

        // Declared 27 bytes: one more than fits.
        let header = [DEFAULT_MARKER, 0x01, 0x00, 27];
        dec.feed(&header[..1]).unwrap();
        let err = dec.feed(&header[1..]).unwrap_err();
        assert_eq!(
            err,
            FrameError::FrameTooLong {
                declared: 27,
                max: 26,
            }
        );
        assert!(dec.is_idle());
        assert_eq!(dec.buffered(), 0);

        // Exactly at the bound is accepted.
        let wire = request(0x01, &[0xAB; 26]);
        assert!(feed_in_chunks(&mut dec, &wire, wire.len()));
    }

    #[test]
    fn every_single_bit_flip_is_rejected() {
        let wire = request(0x11, b"bits");
        // Flips in the marker fail at the marker step, flips in the length
        // field may fail as too long; everything else fails the checksum.
        for byte in 0..wire.len() {
            for bit in 0..8 {
                let mut corrupted = wire.clone();
                corrupted[byte] ^= 1 << bit;

                let mut dec = decoder(64);
                let mut pos = 0;
                let mut failure = None;
                while pos < corrupted.len() {
                    match dec.feed(&corrupted[pos..]) {
                        Ok(progress) => {
                            assert!(!progress.is_ready(), "byte {byte} bit {bit} accepted");
                            pos += progress.consumed();
                        }
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
                // A corrupted length field may leave the decoder waiting for more bytes.
                if !(REQUEST_LENGTH_OFFSET..REQUEST_HEADER_SIZE).contains(&byte) {
                    assert!(failure.is_some(), "byte {byte} bit {bit} not rejected");
                }
                if byte == MARKER_SIZE {
                    assert!(
                        matches!(failure, Some(FrameError::ChecksumMismatch { .. })),
                        "command bit {bit} not caught by checksum"
                    );
                }
                assert!(dec.frame().is_none());
            }
        }
    }

    #[test]
    fn checksum_mismatch_reports_values_and_resets() {
        let mut wire = request(0x02, b"abc");
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let mut dec = decoder(64);
        let mut pos = 0;
        let err = loop {
            match dec.feed(&wire[pos..]) {
                Ok(progress) => pos += progress.consumed(),
                Err(err) => break err,
            }
        };
        let expected = crc16(&wire[..wire.len() - CRC_SIZE]);
        assert_eq!(
            err,
            FrameError::ChecksumMismatch {
                expected,
                received: expected ^ 0x00FF,
            }
        );
        assert!(dec.is_idle());
    }

    #[test]
    fn complete_frame_must_be_taken() {
        let wire = request(0x03, b"");
        let mut dec = decoder(16);
        assert!(feed_in_chunks(&mut dec, &wire, wire.len()));

        assert_eq!(dec.feed(&wire).unwrap_err(), FrameError::FrameNotTaken);
        assert!(dec.frame().is_some());

        dec.reset();
        assert!(dec.is_idle());
        assert!(dec.frame().is_none());
        assert!(feed_in_chunks(&mut dec, &wire, 1));
    }
}
