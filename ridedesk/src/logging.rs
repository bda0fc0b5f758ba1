//! File logging setup.
//!
//! Logs go to a file rather than the terminal so they never tear the TUI
//! dashboard. `RUST_LOG` overrides the default filter.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log file name inside the logging directory.
pub const DEFAULT_LOG_FILE: &str = "ridedesk.log";

const DEFAULT_FILTER: &str = "ridedesk=info,ridedesk_cli=info";
const VERBOSE_FILTER: &str = "ridedesk=debug,ridedesk_cli=debug";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Keeps the background log writer alive; pending lines are flushed on drop.
#[must_use = "dropping the guard stops the log writer"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    /// Full path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Install the global subscriber writing to `dir/file_name`.
pub fn init_logging(
    dir: &Path,
    file_name: &str,
    verbose: bool,
) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    });

    // The local offset can only be read reliably before other threads exist.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_timer(OffsetTime::new(offset, Rfc3339)),
        )
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    let path = dir.join(file_name);
    tracing::info!(path = %path.display(), version = crate::VERSION, "Logging initialized");

    Ok(LoggingGuard {
        _worker: worker,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_directory_and_rejects_second_init() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");

        let guard = init_logging(&log_dir, DEFAULT_LOG_FILE, false).unwrap();
        assert!(log_dir.is_dir());
        assert_eq!(guard.path(), log_dir.join(DEFAULT_LOG_FILE));

        assert!(matches!(
            init_logging(&log_dir, DEFAULT_LOG_FILE, true),
            Err(LoggingError::AlreadyInitialized)
        ));
    }
}
