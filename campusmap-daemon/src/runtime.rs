use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

use campusmap_core::SyncConfig;
use campusmap_sync::{pipeline, SyncOrchestrator, SyncReport};

use crate::error::{io_err, DaemonError};

/// Outcome of one scheduled cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub cycle: u64,
    pub remote_ready: bool,
    pub catalog_size: usize,
    pub maps_synced: usize,
    pub static_synced: usize,
    pub duration_ms: u128,
    pub finished_at_unix: u64,
}

impl SyncSummary {
    fn from_report(cycle: u64, report: &SyncReport) -> Self {
        Self {
            cycle,
            remote_ready: report.remote_ready,
            catalog_size: report.catalog_size,
            maps_synced: report.maps_synced(),
            static_synced: report.static_synced(),
            duration_ms: report.duration_ms,
            finished_at_unix: unix_seconds_now(),
        }
    }
}

/// Log output format for the daemon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: SyncConfig, format: LogFormat) -> Result<(), DaemonError> {
    init_tracing(format);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon until ctrl-c.
pub async fn run(config: SyncConfig) -> Result<(), DaemonError> {
    let orchestrator = Arc::new(pipeline::orchestrator_from_config(&config).await?);
    let interval = config.sync_interval();
    tracing::info!(
        cache_dir = %config.cache_dir.display(),
        interval_secs = interval.as_secs(),
        remote = config
            .remote_snapshot
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "offline".to_string()),
        "campusmap daemon starting",
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let result = run_with(orchestrator, interval, shutdown.subscribe(), None).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err.to_string())),
                    }
                }
            }
        })
    };

    let (scheduler_result, signal_result) = tokio::join!(scheduler_handle, signal_handle);
    handle_join("scheduler", scheduler_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("campusmap daemon stopped");
    Ok(())
}

/// Scheduler loop: run a cycle immediately, then every `interval` until a
/// shutdown message arrives. Each summary is forwarded to `reports` when set.
///
/// A cycle in progress finishes before shutdown is observed.
pub async fn run_with(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
    reports: Option<mpsc::Sender<SyncSummary>>,
) -> Result<(), DaemonError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle = 0u64;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                cycle += 1;
                let report = orchestrator.check_and_sync().await;
                let summary = SyncSummary::from_report(cycle, &report);
                tracing::info!(
                    cycle,
                    remote_ready = summary.remote_ready,
                    maps_synced = summary.maps_synced,
                    static_synced = summary.static_synced,
                    duration_ms = summary.duration_ms,
                    "scheduled sync finished",
                );
                if let Some(tx) = &reports {
                    if tx.send(summary).await.is_err() {
                        tracing::debug!("summary receiver dropped");
                    }
                }
            }
        }
    }

    tracing::debug!(cycles = cycle, "scheduler stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = match format {
        LogFormat::Text => fmt().with_env_filter(filter).with_target(false).try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
    };
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::TaskJoin {
            task,
            reason: err.to_string(),
        }),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
