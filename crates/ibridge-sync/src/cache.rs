//! Change detection cache
//!
//! Remembers the last observed modification time and size of every local
//! file the upload direction has looked at, so unchanged files can be
//! skipped. State is in-memory only and starts empty on every process.
//!
//! Records older than the retention window (24 hours by default) count as
//! absent, which forces a periodic re-transfer even of untouched files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, trace};

use crate::SyncError;

/// Default retention window for cache records
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Last observed state of one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub size: u64,
    pub cached_at: Instant,
}

/// Diagnostic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of records currently held
    pub entries: usize,
    /// Total `has_changed` calls since creation
    pub checks: u64,
}

/// Thread-safe change cache keyed by absolute path
///
/// Readers share the map; a writer takes it exclusively only when a record
/// is created or refreshed.
#[derive(Debug)]
pub struct ChangeCache {
    records: RwLock<HashMap<PathBuf, FileRecord>>,
    max_age: Duration,
    checks: AtomicU64,
}

impl Default for ChangeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::with_max_age(DEFAULT_MAX_AGE)
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_age,
            checks: AtomicU64::new(0),
        }
    }

    /// Whether `path` needs transferring since it was last observed.
    ///
    /// A path that cannot be stat'ed reports `true` without error. First
    /// sight, an expired record, or a different mtime or size all report
    /// `true` and refresh the record. Only an unchanged, fresh record
    /// reports `false`, and leaves the map untouched.
    ///
    /// # Errors
    /// Fails only when a relative `path` cannot be made absolute.
    pub async fn has_changed(&self, path: &Path) -> Result<bool, SyncError> {
        self.checks.fetch_add(1, Ordering::Relaxed);

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Stat failed, treating as changed");
                return Ok(true);
            }
        };

        let key = absolute(path)?;
        let modified = metadata.modified().ok();
        let size = metadata.len();

        {
            let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = records.get(&key) {
                let fresh = record.cached_at.elapsed() <= self.max_age;
                if fresh && record.modified == modified && record.size == size {
                    trace!(path = %key.display(), "Unchanged");
                    return Ok(false);
                }
            }
        }

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(
            key.clone(),
            FileRecord {
                path: key,
                modified,
                size,
                cached_at: Instant::now(),
            },
        );
        Ok(true)
    }

    /// Drop the record for `path`, so the next check reports it as changed.
    pub fn forget(&self, path: &Path) {
        if let Ok(key) = absolute(path) {
            self.records
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
        }
    }

    /// Current record for `path`, if any
    pub fn get(&self, path: &Path) -> Option<FileRecord> {
        let key = absolute(path).ok()?;
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Remove every record. The check counter is kept.
    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self
                .records
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            checks: self.checks.load(Ordering::Relaxed),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, SyncError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
