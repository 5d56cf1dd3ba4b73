//! Command dispatch and per-session request processing for LWTP.
//!
//! A [`DispatchTable`] is built once at setup. Each connection owns a
//! [`Session`] that turns raw input chunks into dispatched requests and
//! checksummed response frames:
//!
//! ```
//! use lwtp_server::{CommandContext, DispatchTable, HandlerResult, Session};
//!
//! let mut table = DispatchTable::new();
//! table
//!     .register(0x01, |ctx: &mut CommandContext<'_>| -> HandlerResult {
//!         let payload = ctx.payload();
//!         ctx.write_output(payload)
//!     })
//!     .unwrap();
//!
//! let mut session = Session::new().unwrap();
//! let request = [0xE1, 0x01, 0x00, 0x00, 0xD8, 0x67];
//! let mut responses = Vec::new();
//! session.process(&table, &request, |frame| responses.push(frame.to_vec()));
//! assert_eq!(responses.len(), 1);
//! ```

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;

pub use command::{CommandContext, CommandHandler, HandlerResult, Outcome};
pub use config::{DispatchConfig, SessionConfig};
pub use dispatch::DispatchTable;
pub use error::{HandlerError, Result, ServerError};
pub use session::{ProcessReport, Session};
