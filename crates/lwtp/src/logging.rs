//! Stderr diagnostics. Stdout carries command output only.
//!
//! The library crates log per-byte resync noise at `trace` and rejected
//! frames at `debug`, so the default `info` keeps a busy link quiet. Finer
//! control comes from `LWTP_LOG`, which takes `tracing` directives such as
//! `info,lwtp_frame=debug`.

use clap::ValueEnum;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "LWTP_LOG";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// An explicit `--log-level` applies to every target and ignores `LWTP_LOG`.
/// Otherwise the directives apply on top of an `info` default.
fn build_filter(level: Option<LogLevel>, directives: Option<&str>) -> EnvFilter {
    let default = level.map_or(LevelFilter::INFO, LevelFilter::from);
    let builder = EnvFilter::builder().with_default_directive(default.into());
    match (level, directives) {
        (None, Some(directives)) => builder.parse_lossy(directives),
        _ => builder.parse_lossy(""),
    }
}

pub fn init_logging(format: LogFormat, level: Option<LogLevel>) {
    let directives = std::env::var(LOG_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, directives.as_deref()))
        .with_ansi(false);

    let _ = match format {
        LogFormat::Text => builder.without_time().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
