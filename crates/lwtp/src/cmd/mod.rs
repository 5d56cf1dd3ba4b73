use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use lwtp_frame::{DEFAULT_MARKER, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TX_BUFFER_SIZE};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod encode;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the diagnostic commands on a Unix socket.
    Serve(ServeArgs),
    /// Send one request and print the response.
    Send(SendArgs),
    /// Print the encoded request frame without sending it.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    #[arg(env = "LWTP_SOCKET")]
    pub path: PathBuf,
    /// Frame marker byte (decimal or 0x-prefixed hex).
    #[arg(long, default_value_t = DEFAULT_MARKER, value_parser = parse_byte)]
    pub marker: u8,
    /// Receive buffer size in bytes, including header and checksum.
    #[arg(long, default_value_t = DEFAULT_RX_BUFFER_SIZE)]
    pub rx_buffer: usize,
    /// Transmit buffer size in bytes, including header and checksum.
    #[arg(long, default_value_t = DEFAULT_TX_BUFFER_SIZE)]
    pub tx_buffer: usize,
    /// Drop a partial frame after this much silence (e.g. 2s, 500ms).
    #[arg(long, value_parser = parse_duration)]
    pub idle_timeout: Option<Duration>,
    /// Exit after the first connection closes.
    #[arg(long)]
    pub once: bool,
}

/// Fields shared by every command that builds a request frame.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Command id (decimal or 0x-prefixed hex).
    #[arg(long, short = 'c', value_parser = parse_byte)]
    pub command: u8,
    /// UTF-8 string payload.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Hex-encoded payload (e.g. 0a0b0c).
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Frame marker byte (decimal or 0x-prefixed hex).
    #[arg(long, default_value_t = DEFAULT_MARKER, value_parser = parse_byte)]
    pub marker: u8,
}

impl FrameArgs {
    pub fn payload(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex(hex);
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    #[arg(env = "LWTP_SOCKET")]
    pub path: PathBuf,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Maximum time to wait for the response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build target and protocol defaults.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_byte(input: &str) -> CliResult<u8> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid byte value: {input}")))
}

pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex payload has an odd number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::usage(format!("invalid hex payload: {input}")))
        })
        .collect()
}

/// Parse `<n>ms`, `<n>s`, `<n>m` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration: {input:?}")))?;

    let duration = match unit.trim() {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        other => {
            return Err(CliError::usage(format!(
                "unknown duration unit {other:?} (expected ms, s or m)"
            )))
        }
    };
    if duration.is_zero() {
        return Err(CliError::usage("duration must be greater than zero"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_byte_accepts_decimal_and_hex() {
        assert_eq!(parse_byte("7").unwrap(), 7);
        assert_eq!(parse_byte("0xE1").unwrap(), 0xE1);
        assert_eq!(parse_byte("0Xff").unwrap(), 0xFF);
    }

    #[test]
    fn parse_byte_rejects_out_of_range() {
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("-1").is_err());
        assert!(parse_byte("").is_err());
    }

    #[test]
    fn parse_hex_payloads() {
        assert_eq!(parse_hex("0a0B ff").unwrap(), vec![0x0A, 0x0B, 0xFF]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5h").is_err());
    }

    #[test]
    fn payload_defaults_to_empty() {
        let args = FrameArgs {
            command: 1,
            data: None,
            hex: None,
            marker: DEFAULT_MARKER,
        };
        assert!(args.payload().unwrap().is_empty());
    }
}
