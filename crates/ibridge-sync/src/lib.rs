//! island-bridge Sync - Synchronization engine
//!
//! Provides:
//! - Full-tree upload, download and bidirectional passes
//! - Bounded-concurrency transfers with per-file retry
//! - In-memory change detection for the upload direction
//! - A debounced filesystem watcher driving single-file syncs
//!
//! ## Modules
//!
//! - [`ignore`] - Glob/substring ignore rules
//! - [`cache`] - Change detection cache keyed by absolute path
//! - [`retry`] - Bounded exponential backoff
//! - [`pool`] - Semaphore-bounded transfer worker pool and pass counters
//! - [`engine`] - Directional passes and single-file operations
//! - [`watcher`] - Filesystem notifications, debouncing and dispatch

pub mod cache;
pub mod engine;
pub mod ignore;
pub mod pool;
pub mod retry;
pub mod watcher;

use std::path::PathBuf;

use thiserror::Error;

pub use cache::ChangeCache;
pub use engine::{FileOutcome, SyncEngine};
pub use ignore::IgnoreMatcher;
pub use pool::{SyncStats, TransferPool, TransferTask};
pub use retry::RetryPolicy;
pub use watcher::{ChangeHandler, ChangeWatcher};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The root of a tree walk could not be enumerated
    #[error("Failed to enumerate {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The notification backend rejected a request
    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),

    /// A domain-level error propagated from ibridge-core
    #[error("Domain error: {0}")]
    DomainError(#[from] ibridge_core::domain::DomainError),
}
