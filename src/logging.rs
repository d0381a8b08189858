//! Logging setup: console output routed through the progress display, plus a
//! size-bounded rotating log file

use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use indicatif::MultiProgress;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::EitherWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ImportError, Result};

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
pub struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().map_err(|_| poisoned())?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut buffer = self.buffer.lock().map_err(|_| poisoned())?;
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                let _ = self.multi.println(msg);
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Console writer for tracing
///
/// Prints above the progress bars while they are drawn. When the draw
/// target is hidden (stderr is not a terminal) lines go straight to stderr,
/// since `MultiProgress::println` drops them in that case.
#[derive(Clone)]
pub struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl MultiProgressMakeWriter {
    pub fn new(multi: Arc<MultiProgress>) -> Self {
        Self { multi }
    }
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = EitherWriter<MultiProgressWriter, io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        if self.multi.is_hidden() {
            EitherWriter::B(io::stderr())
        } else {
            EitherWriter::A(MultiProgressWriter::new(Arc::clone(&self.multi)))
        }
    }
}

/// Open the log file, rolling it over once it grows past `max_bytes` and
/// keeping `backup_count` older files as `<path>.1` .. `<path>.N`
///
/// A file is only cut after the write that crossed the limit, so lines are
/// never split between files.
pub fn open_log_file(path: &Path, logging: &LoggingConfig) -> Result<FileRotate<AppendCount>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let max_bytes = usize::try_from(logging.max_bytes).unwrap_or(usize::MAX).max(1);

    Ok(FileRotate::new(
        path,
        AppendCount::new(logging.backup_count),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "log writer lock poisoned")
}

/// Default log file name: `<crate>-<pid>.log` in the working directory
pub fn default_log_path() -> PathBuf {
    PathBuf::from(format!(
        "{}-{}.log",
        env!("CARGO_PKG_NAME"),
        std::process::id()
    ))
}

/// Install the global subscriber: console through `multi`, detailed lines
/// (with source location) to the rotating file at `log_path`
pub fn init(
    log_path: &Path,
    logging: &LoggingConfig,
    verbose: bool,
    multi: Arc<MultiProgress>,
) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mbox_group_import=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mbox_group_import=info,warn"))
    };

    let file_writer = Mutex::new(open_log_file(log_path, logging)?);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(MultiProgressMakeWriter::new(multi))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ImportError::ConfigError(format!("Failed to initialize logging: {}", e)))
}
