//! `campusmap status`: what the local cache holds.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use campusmap_core::config;
use campusmap_sync::status::{self, format_datetime_age, CacheStatus, MapCacheState};
use campusmap_sync::FsCacheStore;

/// Arguments for `campusmap status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let cfg = config::load().context("failed to load config")?;
        let cache = FsCacheStore::new(&cfg.cache_dir);
        let report = super::runtime()?
            .block_on(status::collect(&cache))
            .context("failed to read cache status")?;

        if self.json {
            let payload = StatusJson {
                cache_dir: cfg.cache_dir.display().to_string(),
                remote: cfg.remote_snapshot.map(|p| p.display().to_string()),
                status: report,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        println!(
            "Campusmap v{} | cache {} | remote {}",
            env!("CARGO_PKG_VERSION"),
            cfg.cache_dir.display(),
            cfg.remote_snapshot
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "offline".to_string()),
        );
        print_tables(report);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusJson {
    cache_dir: String,
    remote: Option<String>,
    #[serde(flatten)]
    status: CacheStatus,
}

#[derive(Tabled)]
struct MapRow {
    #[tabled(rename = "map")]
    map: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "cached")]
    cached: String,
}

#[derive(Tabled)]
struct StaticRow {
    #[tabled(rename = "collection")]
    collection: String,
    #[tabled(rename = "synced")]
    synced: String,
    #[tabled(rename = "file")]
    file: String,
}

fn print_tables(report: CacheStatus) {
    if report.maps.is_empty() {
        println!("No maps cached. Run `campusmap sync`.");
    } else {
        let rows: Vec<MapRow> = report
            .maps
            .into_iter()
            .map(|map| MapRow {
                map: map.map_id.to_string(),
                name: map.map_name,
                version: map.cached_version.unwrap_or_else(|| "-".to_string()),
                state: state_label(&map.state),
                cached: map
                    .cached_at
                    .map(format_datetime_age)
                    .unwrap_or_else(|| "never".to_string()),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    let rows: Vec<StaticRow> = report
        .static_collections
        .into_iter()
        .map(|s| StaticRow {
            collection: s.collection.to_string(),
            synced: if s.synced {
                "yes".green().to_string()
            } else {
                "no".yellow().to_string()
            },
            file: if s.present { "present" } else { "missing" }.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if let Some(at) = report.static_cached_at {
        println!("Static data cached {} ago", format_datetime_age(at));
    }
}

fn state_label(state: &MapCacheState) -> String {
    match state {
        MapCacheState::Cached => "cached".green().to_string(),
        MapCacheState::NeverSynced => "never synced".bright_black().to_string(),
        MapCacheState::Incomplete { missing } => {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            format!("{} ({})", "incomplete".yellow(), names.join(", "))
        }
    }
}
