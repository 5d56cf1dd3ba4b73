//! Push requests through a session the way a UART driver would: in small,
//! irregular fragments with line noise in between.
//!
//! Run with: cargo run -p lwtp --example loopback

use bytes::BytesMut;
use lwtp::builtin::{builtin_table, command_name, CHECKSUM, ECHO, PING, VERSION};
use lwtp::frame::{decode_response, encode_request, DEFAULT_MARKER};
use lwtp::server::{ProcessReport, Session};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table = builtin_table()?;
    let mut session = Session::new()?;

    let mut line = Vec::new();
    for (command, payload) in [
        (PING, &b""[..]),
        (ECHO, &b"hello over the wire"[..]),
        (VERSION, &b""[..]),
        (CHECKSUM, &b"123456789"[..]),
        (0x42, &b"nobody home"[..]),
    ] {
        let mut wire = BytesMut::new();
        encode_request(DEFAULT_MARKER, command, payload, &mut wire)?;
        line.extend_from_slice(&wire);
        line.extend_from_slice(&[0x00, 0x5A]);
    }

    let mut replies = BytesMut::new();
    let mut total = ProcessReport::default();
    let mut seed = 0x2545_F491u32;
    let mut rest = line.as_slice();
    while !rest.is_empty() {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let take = (seed as usize % 7 + 1).min(rest.len());
        let (fragment, tail) = rest.split_at(take);
        rest = tail;

        let report = session.process(&table, fragment, |frame| {
            replies.extend_from_slice(frame)
        });
        total.consumed += report.consumed;
        total.frames += report.frames;
        total.resyncs += report.resyncs;
    }

    println!(
        "consumed {} bytes, answered {} frames, skipped {} noise bytes",
        total.consumed, total.frames, total.resyncs
    );
    while let Some(response) = decode_response(&mut replies, DEFAULT_MARKER)? {
        println!(
            "{:<8} {:<5} {:<15} {:02x?}",
            command_name(response.header.command),
            response.header.status.name(),
            response.header.error_code.name(),
            response.payload.as_ref()
        );
    }
    Ok(())
}
