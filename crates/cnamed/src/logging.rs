//! Log destination setup.
//!
//! The engine and binding emit through the `tracing` facade; this module is
//! the only place a subscriber is installed. Three destinations, selected by
//! `--log`: stderr (the default), the local syslog socket, or an append-only
//! log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{Level, Metadata};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Syslog,
    File(PathBuf),
}

impl LogTarget {
    /// Interpret the `--log` argument the way the CLI documents it.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => Self::Stderr,
            Some(s) if s.eq_ignore_ascii_case("syslog") || s == "/dev/log" => Self::Syslog,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }
}

/// Install the global subscriber for `target`.
///
/// Must run before daemonizing, so a relative log-file path is opened
/// against the directory the user launched from.
pub fn init(target: &LogTarget, verbose: bool, daemon: bool) -> Result<()> {
    let filter = EnvFilter::new(if verbose { "debug" } else { "info" });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match target {
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        LogTarget::Syslog => {
            // syslogd adds its own timestamp
            let writer = SyslogMakeWriter::connect(daemon)?;
            builder
                .with_ansi(false)
                .without_time()
                .with_writer(writer)
                .try_init()
        }
    }
    .map_err(|e| anyhow::anyhow!("cannot install the log subscriber: {e}"))
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))
}

/// Syslog facilities, for the PRI prefix.
const LOG_USER: u8 = 1;
const LOG_DAEMON: u8 = 3;

/// Severity half of the PRI value for one event level.
fn severity(level: Level) -> u8 {
    match level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        _ => 7,
    }
}

/// Connects to the local syslog socket and stamps each event with a
/// `<PRI>tag[pid]:` prefix.
pub struct SyslogMakeWriter {
    socket: Arc<UnixDatagram>,
    tag: String,
    facility: u8,
}

impl SyslogMakeWriter {
    /// Socket paths tried in order.
    const SOCKET_PATHS: [&'static str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

    /// Connect to the first syslog socket that exists.
    ///
    /// A daemonized service logs under the daemon facility, a foreground
    /// run under the user facility.
    fn connect(daemon: bool) -> Result<Self> {
        let socket = UnixDatagram::unbound().context("cannot create a datagram socket")?;

        let path = Self::SOCKET_PATHS
            .iter()
            .find(|p| Path::new(p).exists())
            .ok_or_else(|| anyhow::anyhow!("no syslog socket found"))?;
        socket
            .connect(path)
            .with_context(|| format!("cannot connect to syslog at '{path}'"))?;

        Ok(Self {
            socket: Arc::new(socket),
            tag: program_name(),
            facility: if daemon { LOG_DAEMON } else { LOG_USER },
        })
    }

    fn writer(&self, severity: u8) -> SyslogWriter {
        SyslogWriter {
            socket: Arc::clone(&self.socket),
            prefix: format!(
                "<{}>{}[{}]: ",
                self.facility * 8 + severity,
                self.tag,
                std::process::id()
            ),
            buf: Vec::new(),
        }
    }
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer(severity(Level::INFO))
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.writer(severity(*meta.level()))
    }
}

/// One buffered event, sent as one datagram per line when dropped.
pub struct SyslogWriter {
    socket: Arc<UnixDatagram>,
    prefix: String,
    buf: Vec<u8>,
}

impl Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for line in self.buf.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            let mut datagram = Vec::with_capacity(self.prefix.len() + line.len());
            datagram.extend_from_slice(self.prefix.as_bytes());
            datagram.extend_from_slice(line);
            self.socket.send(&datagram)?;
        }
        self.buf.clear();
        Ok(())
    }
}

impl Drop for SyslogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn program_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "cnamed".to_string())
}
