//! Aggregate result of a sync pass

use serde::{Deserialize, Serialize};

use super::target::SyncMode;

/// Snapshot of the counters of one full sync pass or one watch session
///
/// Produced once the pass has drained its worker pool. A bidirectional pass
/// reports both its download and upload halves in the same summary. Full
/// passes never remove anything, so `deleted` only moves in watch sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Mode the pass ran in
    pub mode: SyncMode,
    /// Files pushed to the remote
    pub transferred: u64,
    /// Files pulled from the remote
    pub downloaded: u64,
    /// Remote counterparts removed
    pub deleted: u64,
    /// Files ignored, unchanged, or reached through a directory symlink
    pub skipped: u64,
    /// Files that failed after exhausting retries
    pub errors: u64,
    /// Human-readable message per failed file
    pub error_messages: Vec<String>,
    /// Wall-clock duration of the pass
    pub duration_ms: u64,
}

impl SyncSummary {
    /// Total number of files moved in either direction
    pub fn total_transferred(&self) -> u64 {
        self.transferred + self.downloaded
    }

    /// True when no file failed
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
