//! Progress observer port
//!
//! The engine reports per-file outcomes and pass boundaries through this
//! interface instead of writing to the terminal itself. Observers are purely
//! informational: nothing they do changes what the engine transfers.
//!
//! ## Design Notes
//!
//! - Callbacks are synchronous and invoked from worker tasks, possibly from
//!   several at once; implementations must be `Send + Sync`.
//! - Every method has an empty default body so observers only implement
//!   what they care about.

use std::path::Path;

use crate::domain::{SyncMode, SyncSummary, TransferDirection};

/// Port trait for sync progress reporting
pub trait IProgressObserver: Send + Sync {
    /// A pass is about to schedule `total` files
    fn on_pass_started(&self, _mode: SyncMode, _direction: TransferDirection, _total: usize) {}

    /// A file was transferred successfully
    fn on_transferred(&self, _path: &Path, _direction: TransferDirection) {}

    /// A scheduled file needed no transfer; counts toward the pass total
    fn on_skipped(&self, _path: &Path) {}

    /// The walk left a path out of the pass (ignore rule or directory
    /// symlink); not part of the pass total. Reported after `on_pass_started`.
    fn on_ignored(&self, _path: &Path) {}

    /// A file failed after exhausting its attempts
    fn on_error(&self, _path: &Path, _error: &anyhow::Error) {}

    /// The pass drained; `summary` holds the final counters
    fn on_pass_finished(&self, _summary: &SyncSummary) {}
}

/// Observer that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl IProgressObserver for NoopProgress {}
