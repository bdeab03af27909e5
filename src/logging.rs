// SPDX-License-Identifier: MIT
//
// Tracing setup. The terminal belongs to the UI, so logs go to a file;
// follow them with `tail -f` from another terminal.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot create log directory {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log path has no file name: {0:?}")]
    InvalidPath(PathBuf),

    #[error("tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

/// Split a log path into the directory to create and the file name.
/// A bare file name logs into the current directory.
fn split_log_path(path: &Path) -> Result<(&Path, &str), LoggingError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok((directory, file_name))
}

/// Install the global subscriber writing to `log_path`.
///
/// `RUST_LOG` selects what is recorded (default `info`).
///
/// # Errors
///
/// Fails if the directory cannot be created, the path names no file, or a
/// subscriber is already installed.
pub fn init(log_path: &Path) -> Result<(), LoggingError> {
    let (directory, file_name) = split_log_path(log_path)?;
    std::fs::create_dir_all(directory).map_err(|source| LoggingError::DirectoryCreation {
        path: directory.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|_| LoggingError::SubscriberAlreadySet)
}
