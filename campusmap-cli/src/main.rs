//! Campusmap: campus map data sync CLI.
//!
//! # Usage
//!
//! ```text
//! campusmap init [--remote <snapshot.json>]
//! campusmap sync [--json]
//! campusmap status [--json]
//! campusmap daemon [--interval <secs>] [--log-format text|json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemon::DaemonArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "campusmap",
    version,
    about = "Keep a local campus map cache in sync with the remote document store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.campusmap/config.yaml and create the cache directory.
    Init(InitArgs),

    /// Run one check-and-sync cycle against the configured remote.
    Sync(SyncArgs),

    /// Show what the local cache currently holds.
    Status(StatusArgs),

    /// Run check-and-sync periodically in the foreground until ctrl-c.
    Daemon(DaemonArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => {
            commands::init_tracing();
            args.run()
        }
        Commands::Status(args) => args.run(),
        Commands::Daemon(args) => args.run(),
    }
}
