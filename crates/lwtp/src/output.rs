use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lwtp::builtin::command_name;
use lwtp_frame::ResponseFrame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    command: u8,
    command_name: &'a str,
    status: &'a str,
    error_code: u8,
    error_name: &'a str,
    payload_size: usize,
    payload: String,
    payload_hex: String,
}

pub fn print_response(response: &ResponseFrame, format: OutputFormat) {
    let header = &response.header;
    let payload = response.payload.as_ref();
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                command: header.command,
                command_name: command_name(header.command),
                status: header.status.name(),
                error_code: header.error_code.as_u8(),
                error_name: header.error_code.name(),
                payload_size: payload.len(),
                payload: payload_preview(payload),
                payload_hex: to_hex(payload),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "STATUS", "ERROR", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    format!("0x{:02X} ({})", header.command, command_name(header.command)),
                    header.status.name().to_string(),
                    format!("{} ({})", header.error_code.as_u8(), header.error_code.name()),
                    payload.len().to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "command=0x{:02X} ({}) status={} error={} ({}) size={} payload={}",
                header.command,
                command_name(header.command),
                header.status.name(),
                header.error_code.as_u8(),
                header.error_code.name(),
                payload.len(),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(payload);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lowercase hex without separators.
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}
