//! Transfer worker pool and pass counters
//!
//! A pass hands the pool its candidate list; the pool spawns one task per
//! file, bounds how many run at once with a counting semaphore, and blocks
//! until all of them have finished. One file failing never stops its
//! siblings.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use ibridge_core::domain::{SyncMode, SyncSummary, TransferDirection};
use ibridge_core::ports::IProgressObserver;

/// Default number of concurrent transfers
pub const DEFAULT_CONCURRENCY: usize = 10;

// ============================================================================
// TransferTask
// ============================================================================

/// One file to move in one direction. Created per file per pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub direction: TransferDirection,
}

impl TransferTask {
    pub fn upload(local_path: PathBuf, remote_path: String) -> Self {
        Self {
            local_path,
            remote_path,
            direction: TransferDirection::Upload,
        }
    }

    pub fn download(remote_path: String, local_path: PathBuf) -> Self {
        Self {
            local_path,
            remote_path,
            direction: TransferDirection::Download,
        }
    }

    /// Where the bytes come from
    pub fn source(&self) -> String {
        match self.direction {
            TransferDirection::Upload => self.local_path.display().to_string(),
            TransferDirection::Download => self.remote_path.clone(),
        }
    }

    /// Where the bytes go
    pub fn destination(&self) -> String {
        match self.direction {
            TransferDirection::Upload => self.remote_path.clone(),
            TransferDirection::Download => self.local_path.display().to_string(),
        }
    }
}

/// What a worker did with its task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Transferred,
    Skipped,
}

// ============================================================================
// SyncStats
// ============================================================================

/// Counters of one full pass
///
/// Created fresh for every pass and shared by all workers of that pass.
/// Counters only move through atomic increments.
#[derive(Debug, Default)]
pub struct SyncStats {
    transferred: AtomicU64,
    downloaded: AtomicU64,
    deleted: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
    error_messages: Mutex<Vec<String>>,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a completed transfer under its direction
    pub fn record_transferred(&self, direction: TransferDirection) {
        match direction {
            TransferDirection::Upload => self.transferred.fetch_add(1, Ordering::Relaxed),
            TransferDirection::Download => self.downloaded.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, message: impl Into<String>) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.error_messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.into());
    }

    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Freeze the counters into a summary
    pub fn snapshot(&self, mode: SyncMode, duration: Duration) -> SyncSummary {
        SyncSummary {
            mode,
            transferred: self.transferred(),
            downloaded: self.downloaded(),
            deleted: self.deleted.load(Ordering::Relaxed),
            skipped: self.skipped(),
            errors: self.errors(),
            error_messages: self
                .error_messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

// ============================================================================
// TransferPool
// ============================================================================

/// Semaphore-bounded executor for per-file transfer tasks
#[derive(Debug, Clone)]
pub struct TransferPool {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl Default for TransferPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl TransferPool {
    /// A pool running at most `concurrency` tasks at once (at least one).
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `worker` over every task and wait for all of them.
    ///
    /// Outcomes are folded into `stats` and reported to `observer` as tasks
    /// complete, in completion order. A worker error or panic is recorded
    /// against its file only.
    pub async fn run<F, Fut>(
        &self,
        tasks: Vec<TransferTask>,
        stats: &SyncStats,
        observer: &dyn IProgressObserver,
        worker: F,
    ) where
        F: Fn(TransferTask) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskOutcome>> + Send + 'static,
    {
        let worker = Arc::new(worker);
        let mut set = JoinSet::new();

        for task in tasks {
            let semaphore = Arc::clone(&self.semaphore);
            let worker = Arc::clone(&worker);
            set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => worker(task.clone()).await,
                    Err(e) => Err(anyhow::anyhow!("transfer pool closed: {e}")),
                };
                (task, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((task, Ok(TaskOutcome::Transferred))) => {
                    debug!(
                        direction = %task.direction,
                        source = %task.source(),
                        destination = %task.destination(),
                        "Transferred"
                    );
                    stats.record_transferred(task.direction);
                    observer.on_transferred(&task.local_path, task.direction);
                }
                Ok((task, Ok(TaskOutcome::Skipped))) => {
                    stats.record_skipped();
                    observer.on_skipped(&task.local_path);
                }
                Ok((task, Err(err))) => {
                    let msg = format!("{}: {err:#}", task.source());
                    warn!(%msg, "Transfer failed");
                    stats.record_error(msg);
                    observer.on_error(&task.local_path, &err);
                }
                Err(join_err) => {
                    error!(error = %join_err, "Transfer task panicked");
                    stats.record_error(format!("transfer task panicked: {join_err}"));
                }
            }
        }
    }
}
