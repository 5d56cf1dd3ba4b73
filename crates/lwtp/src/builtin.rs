//! Diagnostic commands.
//!
//! Command ids below 0x10 are used here; applications registering their own
//! handlers alongside these should start above that.

use lwtp_frame::{crc16, ErrorCode};
use lwtp_server::{CommandContext, DispatchTable, HandlerResult, Result};

/// Answers with an empty OK response.
pub const PING: u8 = 0x01;

/// Answers with the request payload.
pub const ECHO: u8 = 0x02;

/// Answers with the crate version string.
pub const VERSION: u8 = 0x03;

/// Answers with the big-endian CRC-16 of the request payload.
pub const CHECKSUM: u8 = 0x04;

/// Returns a human-readable name for a command id.
pub fn command_name(id: u8) -> &'static str {
    match id {
        PING => "PING",
        ECHO => "ECHO",
        VERSION => "VERSION",
        CHECKSUM => "CHECKSUM",
        0x00..=0x0F => "RESERVED",
        _ => "USER",
    }
}

/// Register every diagnostic command on `table`.
pub fn register_builtins(table: &mut DispatchTable) -> Result<()> {
    table.register(PING, ping)?;
    table.register(ECHO, echo)?;
    table.register(VERSION, version)?;
    table.register(CHECKSUM, checksum)?;
    Ok(())
}

/// A table holding only the diagnostic commands.
pub fn builtin_table() -> Result<DispatchTable> {
    let mut table = DispatchTable::new();
    register_builtins(&mut table)?;
    Ok(table)
}

fn ping(_ctx: &mut CommandContext<'_>) -> HandlerResult {
    Ok(())
}

fn echo(ctx: &mut CommandContext<'_>) -> HandlerResult {
    let payload = ctx.payload();
    if payload.len() > ctx.output_capacity() {
        ctx.reject(ErrorCode::DataLength);
        return Ok(());
    }
    ctx.write_output(payload)
}

fn version(ctx: &mut CommandContext<'_>) -> HandlerResult {
    ctx.write_output(env!("CARGO_PKG_VERSION").as_bytes())
}

fn checksum(ctx: &mut CommandContext<'_>) -> HandlerResult {
    let payload = ctx.payload();
    if payload.is_empty() {
        ctx.reject(ErrorCode::DataLength);
        return Ok(());
    }
    ctx.write_output(&crc16(payload).to_be_bytes())
}

#[cfg(test)]
mod tests {
    use lwtp_frame::{RequestFrame, Status};
    use lwtp_server::Outcome;

    use super::*;

    fn call(command: u8, payload: &[u8], output: &mut [u8]) -> Outcome {
        let table = builtin_table().unwrap();
        table.dispatch(&RequestFrame { command, payload }, output)
    }

    #[test]
    fn registers_all_commands_once() {
        let table = builtin_table().unwrap();
        assert_eq!(
            table.commands().collect::<Vec<_>>(),
            vec![PING, ECHO, VERSION, CHECKSUM]
        );
    }

    #[test]
    fn ping_answers_empty_ok() {
        let mut out = [0u8; 8];
        let outcome = call(PING, b"ignored", &mut out);
        assert_eq!(outcome.status, Status::Ok);
        assert_eq!(outcome.output_len, 0);
    }

    #[test]
    fn echo_copies_payload() {
        let mut out = [0u8; 8];
        let outcome = call(ECHO, b"hey", &mut out);
        assert_eq!(outcome.status, Status::Ok);
        assert_eq!(&out[..outcome.output_len], b"hey");
    }

    #[test]
    fn echo_rejects_payload_larger_than_output() {
        let mut out = [0u8; 2];
        let outcome = call(ECHO, b"hey", &mut out);
        assert_eq!(outcome, Outcome::rejected(ErrorCode::DataLength));
    }

    #[test]
    fn version_reports_crate_version() {
        let mut out = [0u8; 32];
        let outcome = call(VERSION, b"", &mut out);
        assert_eq!(
            &out[..outcome.output_len],
            env!("CARGO_PKG_VERSION").as_bytes()
        );
    }

    #[test]
    fn checksum_matches_frame_crc() {
        let mut out = [0u8; 4];
        let outcome = call(CHECKSUM, b"123456789", &mut out);
        assert_eq!(&out[..outcome.output_len], &[0x4B, 0x37]);

        let outcome = call(CHECKSUM, b"", &mut out);
        assert_eq!(outcome, Outcome::rejected(ErrorCode::DataLength));
    }

    #[test]
    fn command_names() {
        assert_eq!(command_name(ECHO), "ECHO");
        assert_eq!(command_name(0x0F), "RESERVED");
        assert_eq!(command_name(0x10), "USER");
    }
}
