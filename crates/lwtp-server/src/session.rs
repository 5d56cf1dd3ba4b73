use std::time::Instant;

use lwtp_frame::{
    write_response_in_place, FrameDecoder, FrameError, Phase, ResponseHeader, CRC_SIZE,
    MAX_WIRE_PAYLOAD, RESPONSE_HEADER_SIZE,
};
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::dispatch::DispatchTable;
use crate::error::Result;

/// Counters for one [`Session::process`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Input bytes consumed. Always the full input length.
    pub consumed: usize,
    /// Complete frames dispatched.
    pub frames: usize,
    /// Decoder resets caused by malformed or stalled input.
    pub resyncs: usize,
}

/// One logical connection: a request decoder plus a response buffer.
///
/// A session handles one frame at a time and must not be shared between
/// threads without external locking.
#[derive(Debug)]
pub struct Session {
    decoder: FrameDecoder,
    tx_buf: Box<[u8]>,
    config: SessionConfig,
    last_rx: Option<Instant>,
}

impl Session {
    /// Create a session with default buffer bounds.
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session with explicit buffer bounds.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            decoder: FrameDecoder::new(&config.frame)?,
            tx_buf: vec![0u8; config.tx_buffer_size].into_boxed_slice(),
            config,
            last_rx: None,
        })
    }

    /// Consume `input`, dispatching every request completed along the way.
    ///
    /// Each encoded response is passed to `transmit` in request order. A
    /// decode failure resets the decoder and resumes one byte past the start
    /// of the failed step.
    pub fn process<F>(
        &mut self,
        table: &DispatchTable,
        input: &[u8],
        mut transmit: F,
    ) -> ProcessReport
    where
        F: FnMut(&[u8]),
    {
        let mut report = ProcessReport::default();
        if self.discard_stalled() {
            report.resyncs += 1;
        }

        let mut pos = 0usize;
        while pos < input.len() {
            match self.decoder.feed(&input[pos..]) {
                Ok(progress) => pos += progress.consumed(),
                Err(err) => {
                    if matches!(err, FrameError::InvalidMarker { .. }) {
                        trace!(offset = pos, "resynchronising");
                    } else {
                        debug!(offset = pos, error = %err, "resynchronising");
                    }
                    self.decoder.reset();
                    report.resyncs += 1;
                    pos += 1;
                }
            }

            if self.decoder.phase() == Phase::Complete {
                let len = self.respond(table);
                if len > 0 {
                    transmit(&self.tx_buf[..len]);
                }
                self.decoder.reset();
                report.frames += 1;
            }
        }

        if !input.is_empty() {
            self.last_rx = Some(Instant::now());
        }
        report.consumed = pos;
        report
    }

    /// Drop a partial frame that has waited longer than the idle timeout.
    ///
    /// Returns true if a frame was discarded. [`process`](Self::process)
    /// calls this before consuming new input.
    pub fn discard_stalled(&mut self) -> bool {
        let (Some(timeout), Some(last_rx)) = (self.config.idle_timeout, self.last_rx) else {
            return false;
        };
        if self.decoder.is_idle() || last_rx.elapsed() < timeout {
            return false;
        }
        debug!(
            buffered = self.decoder.buffered(),
            idle = ?last_rx.elapsed(),
            "discarding stalled partial frame"
        );
        self.decoder.reset();
        true
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Dispatch the buffered request and encode its response into `tx_buf`.
    fn respond(&mut self, table: &DispatchTable) -> usize {
        let Some(request) = self.decoder.frame() else {
            return 0;
        };

        let capacity =
            (self.tx_buf.len() - RESPONSE_HEADER_SIZE - CRC_SIZE).min(MAX_WIRE_PAYLOAD);
        let output = &mut self.tx_buf[RESPONSE_HEADER_SIZE..RESPONSE_HEADER_SIZE + capacity];
        let outcome = table.dispatch(&request, output);

        let header = ResponseHeader {
            command: request.command,
            status: outcome.status,
            error_code: outcome.error_code,
        };
        trace!(
            command = header.command,
            status = header.status.name(),
            error_code = header.error_code.as_u8(),
            output_len = outcome.output_len,
            "encoding response"
        );

        match write_response_in_place(
            &mut self.tx_buf,
            self.config.frame.marker,
            &header,
            outcome.output_len,
        ) {
            Ok(len) => len,
            Err(err) => {
                warn!(command = header.command, error = %err, "failed to encode response");
                0
            }
        }
    }
}
