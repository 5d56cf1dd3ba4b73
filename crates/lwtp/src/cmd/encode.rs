use bytes::BytesMut;
use lwtp_frame::encode_request;
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{CliResult, Context, SUCCESS};
use crate::output::{print_raw, to_hex, OutputFormat};

#[derive(Serialize)]
struct EncodedOutput {
    marker: u8,
    command: u8,
    payload_size: usize,
    wire_size: usize,
    frame_hex: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.frame.payload()?;
    let mut wire = BytesMut::new();
    encode_request(args.frame.marker, args.frame.command, &payload, &mut wire)
        .context("encode failed")?;

    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                marker: args.frame.marker,
                command: args.frame.command,
                payload_size: payload.len(),
                wire_size: wire.len(),
                frame_hex: to_hex(&wire),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => print_raw(&wire),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", to_hex(&wire)),
    }
    Ok(SUCCESS)
}
