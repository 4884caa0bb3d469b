//! YAML configuration for the sync engine.
//!
//! # Storage layout
//!
//! ```text
//! ~/.campusmap/
//!   config.yaml   (mode 0600, created by `campusmap init`)
//!   cache/        (default local cache directory, mode 0700)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15 * 60;

/// Root of the YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub version: u32,
    /// Local cache store root.
    pub cache_dir: PathBuf,
    /// JSON snapshot backing the remote store. `None` runs fully offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_snapshot: Option<PathBuf>,
    #[serde(default = "default_interval")]
    pub sync_interval_secs: u64,
    /// Record a map as synced even when one of its versioned collections
    /// was missing from the version document.
    #[serde(default = "default_record_partial")]
    pub record_partial_version_sync: bool,
}

fn default_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_record_partial() -> bool {
    true
}

impl SyncConfig {
    /// Defaults rooted at `home`.
    pub fn default_at(home: &Path) -> Self {
        Self {
            version: CONFIG_VERSION,
            cache_dir: default_cache_dir_at(home),
            remote_snapshot: None,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            record_partial_version_sync: true,
        }
    }

    /// Daemon period; never shorter than one second.
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.campusmap/`
pub fn root_dir_at(home: &Path) -> PathBuf {
    home.join(".campusmap")
}

/// `<home>/.campusmap/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    root_dir_at(home).join("config.yaml")
}

/// `<home>/.campusmap/cache/`: pure, no I/O.
pub fn default_cache_dir_at(home: &Path) -> PathBuf {
    root_dir_at(home).join("cache")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.campusmap/config.yaml`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let dir = root_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &SyncConfig) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Write a default config pointing at `remote_snapshot` and create the cache
/// directory.
///
/// Idempotent: if the config already exists it is loaded and returned
/// unchanged.
pub fn init_at(home: &Path, remote_snapshot: Option<PathBuf>) -> Result<SyncConfig, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }

    let config = SyncConfig {
        remote_snapshot,
        ..SyncConfig::default_at(home)
    };
    save_at(home, &config)?;
    if !config.cache_dir.exists() {
        std::fs::create_dir_all(&config.cache_dir)?;
        set_dir_permissions(&config.cache_dir)?;
    }
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(remote_snapshot: Option<PathBuf>) -> Result<SyncConfig, ConfigError> {
    init_at(&home()?, remote_snapshot)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(config_path_at(home.path()).ends_with(".campusmap/config.yaml"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = TempDir::new().expect("tempdir");
        let config = SyncConfig {
            remote_snapshot: Some(PathBuf::from("/data/remote.json")),
            sync_interval_secs: 60,
            ..SyncConfig::default_at(home.path())
        };
        save_at(home.path(), &config).expect("save");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn atomic_save_cleans_up_tmp() {
        let home = TempDir::new().expect("tempdir");
        save_at(home.path(), &SyncConfig::default_at(home.path())).expect("save");
        let tmp = config_path_at(home.path()).with_file_name("config.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let home = TempDir::new().expect("tempdir");
        let dir = root_dir_at(home.path());
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(config_path_at(home.path()), "version: 1\ncache_dir: /tmp/cm\n")
            .expect("write");
        let config = load_at(home.path()).expect("load");
        assert_eq!(config.sync_interval_secs, DEFAULT_SYNC_INTERVAL_SECS);
        assert!(config.record_partial_version_sync);
        assert!(config.remote_snapshot.is_none());
    }

    #[test]
    fn zero_interval_clamps_to_one_second() {
        let home = TempDir::new().expect("tempdir");
        let config = SyncConfig {
            sync_interval_secs: 0,
            ..SyncConfig::default_at(home.path())
        };
        assert_eq!(config.sync_interval(), Duration::from_secs(1));
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(ConfigError::HomeNotFound.to_string().contains("home directory"));
    }
}
