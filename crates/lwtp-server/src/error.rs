use lwtp_frame::FrameError;

/// Errors that can occur while setting up a server or session.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The dispatch table refused another binding.
    #[error("dispatch table full ({max} bindings)")]
    TooManyHandlers { max: usize },

    /// Session buffer bounds cannot hold a frame.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Failure signalled by a command handler.
///
/// The message is logged on the server side only; the peer sees the status
/// and error code left in the command context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
