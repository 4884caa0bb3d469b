//! Error types for campusmap-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures loading, saving or initialising `~/.campusmap/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Creating the campusmap or cache directory, or writing the config, failed.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sync settings could not be encoded as YAML.
    #[error("failed to encode config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `config.yaml` exists but is not valid YAML or has wrong field types
    /// (e.g. a non-numeric `sync_interval_secs`).
    #[error("invalid campusmap config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No home directory to place `.campusmap/` under.
    #[error("cannot locate home directory for .campusmap; set $HOME")]
    HomeNotFound,

    /// `sync`, `status` and `daemon` need a config written by `init`.
    #[error("config not found at {path}; run `campusmap init` first")]
    ConfigNotFound { path: PathBuf },
}
