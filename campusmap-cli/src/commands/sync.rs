//! `campusmap sync`: one check-and-sync cycle.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use campusmap_core::config;
use campusmap_sync::{pipeline, versions::MapSyncOutcome, SyncReport};

/// Arguments for `campusmap sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Emit the sync report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let cfg = config::load().context("failed to load config")?;
        let report = super::runtime()?
            .block_on(pipeline::run(&cfg))
            .context("sync failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
            return Ok(());
        }

        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    if !report.remote_ready {
        println!(
            "{} remote unavailable; cached data kept",
            "!".yellow().bold()
        );
        return;
    }

    if report.catalog_size == 0 {
        println!("✓ map catalog is empty; nothing to do");
        return;
    }

    println!(
        "✓ synced in {}ms ({} maps, {} map(s) updated, {} static collection(s) updated)",
        report.duration_ms,
        report.catalog_size,
        report.maps_synced(),
        report.static_synced(),
    );
    if !report.catalog_refreshed {
        println!("  {} catalog fetch failed; used cached catalog", "!".yellow());
    }

    if let Some(versions) = &report.versions {
        for map_id in &versions.up_to_date {
            println!("  ·  {map_id} up to date");
        }
        for map_id in &versions.unknown {
            println!("  ?  {map_id} has no remote version record");
        }
        for result in &versions.synced {
            let line = match &result.outcome {
                MapSyncOutcome::Synced {
                    version, skipped, ..
                } if skipped.is_empty() => format!("  ✎  {} -> {version}", result.map_id),
                MapSyncOutcome::Synced {
                    version, skipped, ..
                } => format!(
                    "  ✎  {} -> {version} (missing: {})",
                    result.map_id,
                    join(skipped)
                ),
                MapSyncOutcome::Incomplete {
                    version, skipped, ..
                } => format!(
                    "  {}  {} {version} incomplete (missing: {})",
                    "!".yellow(),
                    result.map_id,
                    join(skipped)
                ),
                MapSyncOutcome::VersionMissing { version } => format!(
                    "  {}  {} version {version} not found on remote",
                    "!".yellow(),
                    result.map_id
                ),
                MapSyncOutcome::Failed { version, error } => format!(
                    "  {}  {} {version} failed: {error}",
                    "✗".red(),
                    result.map_id
                ),
            };
            println!("{line}");
        }
    }

    match &report.static_data {
        Some(static_report) => {
            for collection in &static_report.verified {
                println!("  ✎  {collection}");
            }
            for failure in &static_report.failed {
                println!(
                    "  {}  {} failed: {}",
                    "✗".red(),
                    failure.collection,
                    failure.error
                );
            }
        }
        None if report.static_checked => println!("  ·  static collections current"),
        None => {}
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
