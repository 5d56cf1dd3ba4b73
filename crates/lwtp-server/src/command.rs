//! The view a command handler gets of one request and its response.

use lwtp_frame::{ErrorCode, Status};

use crate::error::HandlerError;

/// Result type for handler functions. `Err` marks the command as failed.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Status, error code and output length of a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub error_code: ErrorCode,
    pub output_len: usize,
}

impl Outcome {
    /// A failed outcome with no output.
    pub fn rejected(error_code: ErrorCode) -> Self {
        Self {
            status: Status::Error,
            error_code,
            output_len: 0,
        }
    }
}

/// Handles one command id.
pub trait CommandHandler: Send + Sync + 'static {
    /// Read the request from `ctx`, write output into it, and set status.
    ///
    /// Status starts as OK with no error code and no output.
    fn handle(&self, ctx: &mut CommandContext<'_>) -> HandlerResult;
}

impl<F> CommandHandler for F
where
    F: Fn(&mut CommandContext<'_>) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut CommandContext<'_>) -> HandlerResult {
        self(ctx)
    }
}

/// Request payload plus the bounded output buffer of the pending response.
#[derive(Debug)]
pub struct CommandContext<'a> {
    command: u8,
    payload: &'a [u8],
    output: &'a mut [u8],
    status: Status,
    error_code: ErrorCode,
    output_len: usize,
}

impl<'a> CommandContext<'a> {
    /// Create a context with status OK, no error code and no output.
    pub fn new(command: u8, payload: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            command,
            payload,
            output,
            status: Status::Ok,
            error_code: ErrorCode::None,
            output_len: 0,
        }
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    /// Request payload. Borrowed from the receive buffer, not from the
    /// context, so it can be copied into the output directly.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Bytes available for response output.
    pub fn output_capacity(&self) -> usize {
        self.output.len()
    }

    /// The whole output buffer. Call [`set_output_len`](Self::set_output_len)
    /// after writing into it.
    pub fn output_mut(&mut self) -> &mut [u8] {
        &mut *self.output
    }

    /// Declare how many bytes of the output buffer belong to the response.
    pub fn set_output_len(&mut self, len: usize) -> HandlerResult {
        if len > self.output.len() {
            return Err(HandlerError::new(format!(
                "output length {len} exceeds capacity {}",
                self.output.len()
            )));
        }
        self.output_len = len;
        Ok(())
    }

    /// Copy `data` into the output buffer and use it as the response payload.
    pub fn write_output(&mut self, data: &[u8]) -> HandlerResult {
        self.set_output_len(data.len())?;
        self.output[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn set_error_code(&mut self, error_code: ErrorCode) {
        self.error_code = error_code;
    }

    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Answer with an error status, `error_code`, and no output.
    pub fn reject(&mut self, error_code: ErrorCode) {
        self.status = Status::Error;
        self.error_code = error_code;
        self.output_len = 0;
    }

    pub fn outcome(&self) -> Outcome {
        Outcome {
            status: self.status,
            error_code: self.error_code,
            output_len: self.output_len,
        }
    }
}
