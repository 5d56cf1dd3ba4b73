//! Ordered command-id to handler bindings.
//!
//! Lookup is a linear scan returning the first binding registered for an id,
//! so a later binding for the same id is never reached.

use lwtp_frame::{ErrorCode, RequestFrame, Status};
use tracing::{debug, warn};

use crate::command::{CommandContext, CommandHandler, Outcome};
use crate::config::DispatchConfig;
use crate::error::{Result, ServerError};

struct Binding {
    command: u8,
    handler: Box<dyn CommandHandler>,
}

/// Command dispatch table, built once at setup and shared read-only by sessions.
pub struct DispatchTable {
    bindings: Vec<Binding>,
    config: DispatchConfig,
}

impl DispatchTable {
    /// Create an empty table with default config.
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    /// Create an empty table with explicit config.
    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            bindings: Vec::new(),
            config,
        }
    }

    /// Append a binding for `command`.
    pub fn register(&mut self, command: u8, handler: impl CommandHandler) -> Result<()> {
        if self.bindings.len() >= self.config.max_handlers {
            return Err(ServerError::TooManyHandlers {
                max: self.config.max_handlers,
            });
        }
        if self.contains(command) {
            warn!(command, "command already registered; new binding is shadowed");
        }
        self.bindings.push(Binding {
            command,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// First handler registered for `command`.
    pub fn lookup(&self, command: u8) -> Option<&dyn CommandHandler> {
        self.bindings
            .iter()
            .find(|binding| binding.command == command)
            .map(|binding| binding.handler.as_ref())
    }

    pub fn contains(&self, command: u8) -> bool {
        self.lookup(command).is_some()
    }

    /// Registered command ids in registration order, duplicates included.
    pub fn commands(&self) -> impl Iterator<Item = u8> + '_ {
        self.bindings.iter().map(|binding| binding.command)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run the handler for `request`, writing response output into `output`.
    ///
    /// A handler that returns `Err` never produces output. If it left the
    /// status at OK, the outcome becomes an `Internal` error.
    pub fn dispatch(&self, request: &RequestFrame<'_>, output: &mut [u8]) -> Outcome {
        let Some(handler) = self.lookup(request.command) else {
            debug!(command = request.command, "no handler registered");
            return Outcome::rejected(ErrorCode::CommandUnknown);
        };

        let mut ctx = CommandContext::new(request.command, request.payload, output);
        let result = handler.handle(&mut ctx);
        let mut outcome = ctx.outcome();

        if let Err(err) = result {
            warn!(command = request.command, error = %err, "command handler failed");
            if outcome.status == Status::Ok {
                outcome.status = Status::Error;
                outcome.error_code = ErrorCode::Internal;
            }
            outcome.output_len = 0;
        }
        outcome
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("commands", &self.commands().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::HandlerResult;
    use crate::error::HandlerError;

    fn request(command: u8, payload: &[u8]) -> RequestFrame<'_> {
        RequestFrame { command, payload }
    }

    fn echo(ctx: &mut CommandContext<'_>) -> HandlerResult {
        let payload = ctx.payload().to_vec();
        ctx.write_output(&payload)
    }

    #[test]
    fn unknown_command_is_rejected() {
        let table = DispatchTable::new();
        let mut out = [0xFFu8; 16];
        let outcome = table.dispatch(&request(9, b"x"), &mut out);
        assert_eq!(outcome, Outcome::rejected(ErrorCode::CommandUnknown));
    }

    #[test]
    fn found_handler_sees_request_and_writes_output() {
        let mut table = DispatchTable::new();
        table.register(1, echo).unwrap();

        let mut out = [0u8; 16];
        let outcome = table.dispatch(&request(1, b"hello"), &mut out);
        assert_eq!(outcome.status, Status::Ok);
        assert_eq!(outcome.error_code, ErrorCode::None);
        assert_eq!(outcome.output_len, 5);
        assert_eq!(&out[..5], b"hello");
    }

    #[test]
    fn first_registration_wins() {
        let mut table = DispatchTable::new();
        table
            .register(4, |ctx: &mut CommandContext<'_>| ctx.write_output(b"first"))
            .unwrap();
        table
            .register(4, |ctx: &mut CommandContext<'_>| ctx.write_output(b"second"))
            .unwrap();
        assert_eq!(table.commands().collect::<Vec<_>>(), vec![4, 4]);

        let mut out = [0u8; 16];
        let outcome = table.dispatch(&request(4, b""), &mut out);
        assert_eq!(&out[..outcome.output_len], b"first");
    }

    #[test]
    fn failure_with_ok_status_becomes_internal_error() {
        let mut table = DispatchTable::new();
        table
            .register(2, |ctx: &mut CommandContext<'_>| -> HandlerResult {
                ctx.write_output(b"partial")?;
                Err(HandlerError::new("device busy"))
            })
            .unwrap();

        let mut out = [0u8; 16];
        let outcome = table.dispatch(&request(2, b""), &mut out);
        assert_eq!(outcome, Outcome::rejected(ErrorCode::Internal));
    }

    #[test]
    fn failure_keeps_handler_error_code() {
        let mut table = DispatchTable::new();
        table
            .register(3, |ctx: &mut CommandContext<'_>| -> HandlerResult {
                ctx.write_output(b"ignored")?;
                ctx.set_status(Status::Error);
                ctx.set_error_code(ErrorCode::DataLength);
                Err(HandlerError::new("short payload"))
            })
            .unwrap();

        let mut out = [0u8; 16];
        let outcome = table.dispatch(&request(3, b""), &mut out);
        assert_eq!(outcome, Outcome::rejected(ErrorCode::DataLength));
    }

    #[test]
    fn success_preserves_handler_outcome() {
        let mut table = DispatchTable::new();
        table
            .register(5, |ctx: &mut CommandContext<'_>| -> HandlerResult {
                ctx.write_output(&[0xEE])?;
                ctx.set_status(Status::Error);
                ctx.set_error_code(ErrorCode::custom(31).unwrap());
                Ok(())
            })
            .unwrap();

        let mut out = [0u8; 4];
        let outcome = table.dispatch(&request(5, b""), &mut out);
        assert_eq!(
            outcome,
            Outcome {
                status: Status::Error,
                error_code: ErrorCode::custom(31).unwrap(),
                output_len: 1,
            }
        );
    }

    #[test]
    fn output_overflow_is_a_handler_failure() {
        let mut table = DispatchTable::new();
        table.register(1, echo).unwrap();

        let mut out = [0u8; 2];
        let outcome = table.dispatch(&request(1, b"toolong"), &mut out);
        assert_eq!(outcome, Outcome::rejected(ErrorCode::Internal));
    }

    #[test]
    fn registration_is_bounded() {
        let mut table = DispatchTable::with_config(DispatchConfig { max_handlers: 2 });
        table.register(1, echo).unwrap();
        table.register(2, echo).unwrap();
        let err = table.register(3, echo).unwrap_err();
        assert!(matches!(err, ServerError::TooManyHandlers { max: 2 }));
        assert_eq!(table.len(), 2);
        assert!(!table.contains(3));
    }

    #[test]
    fn struct_handlers_are_supported() {
        struct Fixed(&'static [u8]);

        impl CommandHandler for Fixed {
            fn handle(&self, ctx: &mut CommandContext<'_>) -> HandlerResult {
                ctx.write_output(self.0)
            }
        }

        let mut table = DispatchTable::new();
        table.register(0x30, Fixed(b"v1")).unwrap();
        assert!(!table.is_empty());

        let mut out = [0u8; 8];
        let outcome = table.dispatch(&request(0x30, b""), &mut out);
        assert_eq!(&out[..outcome.output_len], b"v1");
    }
}
