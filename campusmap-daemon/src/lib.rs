//! Periodic sync runner: one `check_and_sync` at start, then one per
//! configured interval until ctrl-c.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, run_with, start_blocking, LogFormat, SyncSummary};
