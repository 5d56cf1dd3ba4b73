//! Process exit statuses and the error every subcommand returns.

use std::fmt;
use std::io;
use std::process::ExitCode;

use lwtp_frame::FrameError;
use lwtp_server::ServerError;

pub const SUCCESS: i32 = 0;
/// The peer answered with an error status, or the link went away.
pub const FAILURE: i32 = 1;
/// The peer sent bytes that are not a valid response frame.
pub const PROTOCOL_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

/// Lower-layer errors that know which exit status they map to.
pub trait ExitStatus: fmt::Display + Sized {
    fn exit_status(&self) -> i32;

    fn into_cli(self, context: &str) -> CliError {
        CliError::new(self.exit_status(), format!("{context}: {self}"))
    }
}

impl ExitStatus for io::Error {
    fn exit_status(&self) -> i32 {
        match self.kind() {
            io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotFound
            | io::ErrorKind::UnexpectedEof => FAILURE,
            _ => INTERNAL,
        }
    }
}

impl ExitStatus for FrameError {
    fn exit_status(&self) -> i32 {
        match self {
            FrameError::PayloadTooLarge { .. } | FrameError::BufferTooSmall { .. } => DATA_INVALID,
            FrameError::InvalidMarker { .. }
            | FrameError::ChecksumMismatch { .. }
            | FrameError::InvalidStatus(_)
            | FrameError::FrameTooLong { .. } => PROTOCOL_ERROR,
            FrameError::FrameNotTaken => INTERNAL,
        }
    }
}

impl ExitStatus for ServerError {
    fn exit_status(&self) -> i32 {
        match self {
            ServerError::Frame(err) => err.exit_status(),
            ServerError::InvalidConfig(_) => USAGE,
            ServerError::TooManyHandlers { .. } => INTERNAL,
        }
    }
}

/// `map_err` shorthand that prefixes the message and keeps the error's status.
pub trait Context<T> {
    fn context(self, context: &str) -> CliResult<T>;
}

impl<T, E: ExitStatus> Context<T> for Result<T, E> {
    fn context(self, context: &str) -> CliResult<T> {
        self.map_err(|err| err.into_cli(context))
    }
}

/// Statuses above 255 cannot be reported by the OS and collapse to 1.
pub fn exit_code(status: i32) -> ExitCode {
    u8::try_from(status).map_or(ExitCode::FAILURE, ExitCode::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_context_and_status() {
        let err = Err::<(), _>(io::Error::from(io::ErrorKind::TimedOut))
            .context("read")
            .unwrap_err();
        assert_eq!(err.code, TIMEOUT);
        assert_eq!(err.to_string(), "read: timed out");

        let err = io::Error::from(io::ErrorKind::NotFound).into_cli("connect");
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn invalid_config_is_a_usage_error() {
        let err = ServerError::InvalidConfig("rx_buffer_size 2".to_string());
        assert_eq!(err.exit_status(), USAGE);
    }

    #[test]
    fn corrupted_response_is_a_protocol_error() {
        let err = ServerError::Frame(FrameError::ChecksumMismatch {
            expected: 1,
            received: 2,
        });
        assert_eq!(err.exit_status(), PROTOCOL_ERROR);
        assert_eq!(
            FrameError::PayloadTooLarge {
                size: 70_000,
                max: 65_535
            }
            .exit_status(),
            DATA_INVALID
        );
    }
}
