//! Background reader: frames inbound bytes into lines and hands them to a sink.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::command::parse_position;
use crate::constants::{LOG_FILE_NAME, PARTIAL_LINE_TIMEOUT, READER_IDLE_SLEEP_MICROS};
use crate::error::{KmError, KmResult};
use crate::line::{DecodePolicy, LineAssembler};
use crate::session::PortSession;

/// Destination for decoded lines
pub trait LineSink: Send {
    fn accept(&mut self, line: &str) -> KmResult<()>;
}

/// Prints `Received: <line>`
pub struct ConsoleSink<W: Write + Send> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleSink {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        ConsoleSink { out }
    }
}

impl<W: Write + Send> LineSink for ConsoleSink<W> {
    fn accept(&mut self, line: &str) -> KmResult<()> {
        writeln!(self.out, "Received: {}", line)
            .and_then(|_| self.out.flush())
            .map_err(|e| KmError::Input(format!("Console write failed: {}", e)))
    }
}

/// Appends each line to a log file, then passes it on to the console.
/// The file is reopened for every line so no handle outlives a write.
pub struct LoggingSink<S: LineSink> {
    path: PathBuf,
    console: S,
}

impl<S: LineSink> LoggingSink<S> {
    pub fn new(path: impl Into<PathBuf>, console: S) -> Self {
        LoggingSink {
            path: path.into(),
            console,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> KmResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| KmError::LogFile(format!("{}: {}", self.path.display(), e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| KmError::LogFile(format!("{}: {}", self.path.display(), e)))
    }
}

impl<S: LineSink> LineSink for LoggingSink<S> {
    fn accept(&mut self, line: &str) -> KmResult<()> {
        self.append(line)?;
        self.console.accept(line)
    }
}

/// `log.txt` next to the running executable, or in the working directory
/// when the executable path is unknown.
pub fn default_log_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyLinePolicy {
    Forward,
    Discard,
}

/// Reaction to a transport failure while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorPolicy {
    /// Report and end the reader; the process keeps running
    Stop,
    /// Report and keep polling
    Continue,
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub decode: DecodePolicy,
    pub empty_lines: EmptyLinePolicy,
    pub on_error: ReadErrorPolicy,
    pub stale_after: Duration,
}

impl ReaderConfig {
    /// Keyboard harness: print everything, give up on the first read error
    pub fn harness() -> Self {
        ReaderConfig {
            decode: DecodePolicy::Replace,
            empty_lines: EmptyLinePolicy::Forward,
            on_error: ReadErrorPolicy::Stop,
            stale_after: PARTIAL_LINE_TIMEOUT,
        }
    }

    /// Logger: skip blank lines, survive read errors
    pub fn logger() -> Self {
        ReaderConfig {
            decode: DecodePolicy::Ignore,
            empty_lines: EmptyLinePolicy::Discard,
            on_error: ReadErrorPolicy::Continue,
            stale_after: PARTIAL_LINE_TIMEOUT,
        }
    }
}

pub struct ReaderLoop<S: LineSink> {
    session: Arc<PortSession>,
    assembler: LineAssembler,
    sink: S,
    config: ReaderConfig,
}

impl<S: LineSink + 'static> ReaderLoop<S> {
    pub fn new(session: Arc<PortSession>, sink: S, config: ReaderConfig) -> Self {
        ReaderLoop {
            session,
            assembler: LineAssembler::with_stale_after(config.decode, config.stale_after),
            sink,
            config,
        }
    }

    /// One poll of the port. Returns the number of lines handed to the sink.
    pub fn step(&mut self) -> KmResult<usize> {
        let now = Instant::now();
        let bytes = self.session.poll()?;
        if bytes.is_empty() {
            self.assembler.discard_stale(now);
            return Ok(0);
        }

        let mut forwarded = 0;
        for line in self.assembler.push(&bytes, now) {
            if line.is_empty() && self.config.empty_lines == EmptyLinePolicy::Discard {
                continue;
            }
            if let Some((x, y)) = parse_position(&line) {
                debug!("Firmware reports cursor at ({}, {})", x, y);
            }
            // A sink failure loses this line only
            match self.sink.accept(&line) {
                Ok(()) => forwarded += 1,
                Err(e) => {
                    println!("Error handling received line: {}", e);
                    error!("Sink rejected line {:?}: {}", line, e);
                }
            }
        }
        Ok(forwarded)
    }

    /// Poll until the session is closed, or until a read error under
    /// [`ReadErrorPolicy::Stop`].
    pub fn run(mut self) {
        let idle = Duration::from_micros(READER_IDLE_SLEEP_MICROS);
        loop {
            match self.step() {
                Ok(0) => std::thread::sleep(idle),
                Ok(_) => {}
                Err(KmError::PortClosed(name)) => {
                    info!("Reader for {} stopped: port closed", name);
                    break;
                }
                Err(e) => {
                    println!("Error reading from serial port: {}", e);
                    error!("Read from {} failed: {}", self.session.name(), e);
                    if self.config.on_error == ReadErrorPolicy::Stop {
                        break;
                    }
                    std::thread::sleep(idle);
                }
            }
        }
    }

    pub fn spawn(self) -> KmResult<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("serial-reader".to_owned())
            .spawn(move || self.run())
            .map_err(|e| KmError::Communication(format!("Failed to spawn reader thread: {}", e)))
    }
}
