//! Tracing setup shared by the server and the CLI.
//!
//! Events go to a compact stdout layer and, through a non-blocking writer, to an append-only
//! log file so chunking workers never wait on disk.
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_PATH: &str = "logs/chunkflow.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` controls filtering and defaults to `info`. File output goes to `log_file`, or to
/// `logs/chunkflow.log` when `None`. If the file cannot be opened the process keeps logging to
/// stdout only. Calling this more than once leaves the first subscriber in place.
pub fn init_tracing(log_file: Option<&Path>) {
    let path = log_file.map_or_else(|| PathBuf::from(DEFAULT_LOG_PATH), Path::to_path_buf);
    let file_layer = match open_log_writer(&path) {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact(),
        ),
        Err(err) => {
            eprintln!("Logging to stdout only; cannot open {}: {err}", path.display());
            None
        }
    };

    let installed = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init();
    if installed.is_ok() {
        tracing::debug!(log_file = %path.display(), "Tracing initialized");
    }
}

/// Open `path` for appending, creating missing parent directories, behind a non-blocking writer.
///
/// The writer's guard is parked in a static so buffered events flush at process exit.
fn open_log_writer(path: &Path) -> io::Result<NonBlocking> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}
