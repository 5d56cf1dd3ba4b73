use std::io::{self, Read};

use bytes::BytesMut;
use lwtp_frame::{decode_response, encode_request, ResponseFrame, Status, RESPONSE_OVERHEAD};
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{CliError, CliResult, Context, ExitStatus, FAILURE, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.frame.payload()?;
    let mut request = BytesMut::new();
    encode_request(args.frame.marker, args.frame.command, &payload, &mut request)
        .context("encode failed")?;

    let response = exchange(&args, &request)?;
    print_response(&response, format);

    match response.header.status {
        Status::Ok => Ok(SUCCESS),
        Status::Error => Ok(FAILURE),
    }
}

#[cfg(unix)]
fn exchange(args: &SendArgs, request: &[u8]) -> CliResult<ResponseFrame> {
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    let mut stream = UnixStream::connect(&args.path)
        .context(&format!("connect to {} failed", args.path.display()))?;
    stream
        .set_read_timeout(Some(args.timeout))
        .and_then(|()| stream.set_write_timeout(Some(args.timeout)))
        .context("connection setup failed")?;

    debug!(
        command = args.frame.command,
        wire_size = request.len(),
        "sending request"
    );
    stream.write_all(request).context("send failed")?;

    read_response(&mut stream, args.frame.marker)
}

#[cfg(not(unix))]
fn exchange(_args: &SendArgs, _request: &[u8]) -> CliResult<ResponseFrame> {
    Err(CliError::usage("send requires Unix domain sockets"))
}

/// Read until one complete response frame is buffered.
fn read_response<R: Read>(reader: &mut R, marker: u8) -> CliResult<ResponseFrame> {
    let mut buf = BytesMut::with_capacity(RESPONSE_OVERHEAD);
    let mut chunk = [0u8; 256];
    loop {
        if let Some(frame) =
            decode_response(&mut buf, marker).context("invalid response")?
        {
            debug!(
                command = frame.header.command,
                status = frame.header.status.name(),
                wire_size = frame.wire_size(),
                "received response"
            );
            return Ok(frame);
        }

        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into_cli("receive failed")),
        };
        if n == 0 {
            return Err(CliError::new(
                FAILURE,
                format!(
                    "connection closed with {} byte(s) of an incomplete response",
                    buf.len()
                ),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
