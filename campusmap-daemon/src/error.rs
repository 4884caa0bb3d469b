use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] campusmap_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] campusmap_sync::SyncError),

    #[error("signal handler failed: {0}")]
    Signal(String),

    #[error("{task} task join failure: {reason}")]
    TaskJoin { task: &'static str, reason: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
