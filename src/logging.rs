//! Tracing setup for the CLI.
//!
//! Events go to stderr in compact form so that stdout only carries the paths the CLI prints.
//! A second, ANSI-free layer appends to a log file: `PAGEREPORT_LOG_FILE` when set, otherwise
//! [`RUN_LOG_FILE`] inside the run directory, so every run keeps its own log next to its
//! artifacts.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log file written inside the run directory.
pub const RUN_LOG_FILE: &str = "run.log";
/// Environment variable overriding the log file location.
pub const LOG_FILE_ENV: &str = "PAGEREPORT_LOG_FILE";

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the stderr and file subscribers for a run rooted at `run_dir`.
///
/// `RUST_LOG` overrides the default filter. A log file that cannot be opened only disables
/// the file layer.
pub fn init_tracing(run_dir: &Path) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let file_layer = open_writer(&log_file_path(run_dir)).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Log file for a run: the override from the environment, else `<run_dir>/run.log`.
pub fn log_file_path(run_dir: &Path) -> PathBuf {
    std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| run_dir.join(RUN_LOG_FILE))
}

fn open_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_creates_missing_run_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runs/r1").join(RUN_LOG_FILE);
        assert!(open_writer(&path).is_some());
        assert!(path.is_file());
    }

    #[test]
    fn unwritable_target_disables_file_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(open_writer(dir.path()).is_none());
    }
}
