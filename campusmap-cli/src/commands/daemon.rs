//! `campusmap daemon`: foreground periodic sync.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use campusmap_core::config;
use campusmap_daemon::{start_blocking, LogFormat};

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Seconds between sync cycles (overrides `sync_interval_secs`).
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl DaemonArgs {
    pub fn run(self) -> Result<()> {
        let mut cfg = config::load().context("failed to load config")?;
        if let Some(secs) = self.interval {
            cfg.sync_interval_secs = secs;
        }
        start_blocking(cfg, self.log_format.into()).context("daemon exited with error")?;
        Ok(())
    }
}
