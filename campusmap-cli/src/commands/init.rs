//! `campusmap init [--remote <snapshot.json>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use campusmap_core::config;

/// Create the campusmap config and cache directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// JSON snapshot file backing the remote document store. Without one the
    /// remote is treated as offline and sync keeps the cached data.
    #[arg(long, short = 'r', value_name = "FILE")]
    pub remote: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        let remote = self
            .remote
            .map(|path| {
                path.canonicalize()
                    .with_context(|| format!("cannot resolve remote snapshot '{}'", path.display()))
            })
            .transpose()?;

        let existed = config::config_path_at(&home).exists();
        let cfg = config::init_at(&home, remote).context("failed to initialise campusmap")?;

        if existed {
            println!(
                "✓ Already initialised: {}",
                config::config_path_at(&home).display()
            );
        } else {
            println!(
                "✓ Wrote config: {}",
                config::config_path_at(&home).display()
            );
        }
        println!("  Cache dir: {}", cfg.cache_dir.display());
        match &cfg.remote_snapshot {
            Some(path) => println!("  Remote:    {}", path.display()),
            None => println!("  Remote:    offline (set remote_snapshot in the config)"),
        }
        Ok(())
    }
}
