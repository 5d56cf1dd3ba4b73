//! Lightweight transfer protocol (LWTP): a compact request/response protocol
//! for byte links that fragment and drop data, such as UARTs.
//!
//! # Crate Structure
//!
//! - [`frame`]: CRC-checked frame layout and the resumable request decoder
//! - [`server`]: Command dispatch table and per-connection sessions
//! - [`builtin`]: Diagnostic commands served by the `lwtp` binary

pub mod builtin;

/// Re-export frame types.
pub mod frame {
    pub use lwtp_frame::*;
}

/// Re-export server types.
pub mod server {
    pub use lwtp_server::*;
}
