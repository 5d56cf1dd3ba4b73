use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use lwtp::builtin::builtin_table;
use lwtp_frame::FrameConfig;
use lwtp_server::{DispatchTable, ProcessReport, Session, SessionConfig};
use tracing::{debug, info, trace};

use crate::cmd::ServeArgs;
use crate::exit::{CliError, CliResult, Context, INTERNAL, SUCCESS};

/// How often a blocked read or accept wakes up to check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const READ_CHUNK: usize = 512;

impl ServeArgs {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            frame: FrameConfig {
                marker: self.marker,
                rx_buffer_size: self.rx_buffer,
            },
            tx_buffer_size: self.tx_buffer,
            idle_timeout: self.idle_timeout,
        }
    }
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = args.session_config();
    config.validate().context("invalid session config")?;
    let table = builtin_table().context("dispatch setup failed")?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    listen(&args, config, &table, &running)
}

#[cfg(unix)]
fn listen(
    args: &ServeArgs,
    config: SessionConfig,
    table: &DispatchTable,
    running: &AtomicBool,
) -> CliResult<i32> {
    use std::os::unix::net::UnixListener;

    remove_stale_socket(&args.path)?;
    let listener = UnixListener::bind(&args.path)
        .context(&format!("bind {} failed", args.path.display()))?;
    listener
        .set_nonblocking(true)
        .context("listener setup failed")?;
    info!(
        path = %args.path.display(),
        marker = config.frame.marker,
        rx_buffer = config.frame.rx_buffer_size,
        tx_buffer = config.tx_buffer_size,
        "listening"
    );

    let result = accept_loop(&listener, args.once, config, table, running);
    let _ = std::fs::remove_file(&args.path);
    result
}

#[cfg(unix)]
fn accept_loop(
    listener: &std::os::unix::net::UnixListener,
    once: bool,
    config: SessionConfig,
    table: &DispatchTable,
    running: &AtomicBool,
) -> CliResult<i32> {
    use crate::exit::ExitStatus;

    let mut connections = 0u64;
    while running.load(Ordering::SeqCst) {
        let mut stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL / 5);
                continue;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into_cli("accept failed")),
        };
        connections += 1;

        stream
            .set_nonblocking(false)
            .and_then(|()| stream.set_read_timeout(Some(POLL_INTERVAL)))
            .context("connection setup failed")?;

        let mut session = Session::with_config(config).context("session setup failed")?;
        debug!(connection = connections, "accepted connection");

        match serve_connection(&mut stream, &mut session, table, running) {
            Ok(report) => info!(
                connection = connections,
                consumed = report.consumed,
                frames = report.frames,
                resyncs = report.resyncs,
                "connection closed"
            ),
            Err(err) => info!(connection = connections, error = %err, "connection dropped"),
        }

        if once {
            break;
        }
    }
    Ok(SUCCESS)
}

#[cfg(not(unix))]
fn listen(
    _args: &ServeArgs,
    _config: SessionConfig,
    _table: &DispatchTable,
    _running: &AtomicBool,
) -> CliResult<i32> {
    Err(CliError::usage("serve requires Unix domain sockets"))
}

#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> CliResult<()> {
    use std::os::unix::fs::FileTypeExt;

    use crate::exit::ExitStatus;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => std::fs::remove_file(path)
            .context(&format!("removing stale {} failed", path.display())),
        Ok(_) => Err(CliError::usage(format!(
            "{} exists and is not a socket",
            path.display()
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into_cli(&format!("stat {} failed", path.display()))),
    }
}

/// Pump one connection through `session` until EOF or shutdown.
///
/// Read timeouts are treated as idle ticks so stalled partial frames can be
/// discarded while the peer is silent.
fn serve_connection<S: Read + Write>(
    stream: &mut S,
    session: &mut Session,
    table: &DispatchTable,
    running: &AtomicBool,
) -> io::Result<ProcessReport> {
    let mut total = ProcessReport::default();
    let mut chunk = [0u8; READ_CHUNK];
    let mut outgoing = BytesMut::new();

    while running.load(Ordering::SeqCst) {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                if session.discard_stalled() {
                    total.resyncs += 1;
                }
                continue;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        let report = session.process(table, &chunk[..n], |frame| {
            outgoing.extend_from_slice(frame)
        });
        trace!(
            read = n,
            frames = report.frames,
            resyncs = report.resyncs,
            "processed chunk"
        );
        total.consumed += report.consumed;
        total.frames += report.frames;
        total.resyncs += report.resyncs;

        if !outgoing.is_empty() {
            stream.write_all(&outgoing)?;
            stream.flush()?;
            outgoing.clear();
        }
    }
    Ok(total)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
