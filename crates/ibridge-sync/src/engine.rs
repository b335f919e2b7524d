//! Synchronization engine
//!
//! The [`SyncEngine`] moves files between one local tree and one remote tree
//! through an [`IRemoteStorage`] adapter.
//!
//! ## Passes
//!
//! 1. **Upload**: walk the local tree, prune ignored directories, ask the
//!    change cache about each file, push what changed.
//! 2. **Download**: walk the remote tree through `list_directory`, pull every
//!    non-ignored file. No change detection applies in this direction.
//! 3. **Bidirectional**: a full download pass, then a full upload pass. A file
//!    present on both sides is pulled first, so the push that follows sends
//!    the remote content back unchanged.
//!
//! Transfers of a pass run through the [`TransferPool`], each optionally
//! wrapped in the [`RetryPolicy`]. Single-file operations used by the watcher
//! skip the pool but keep the retry.
//!
//! ## Failure policy
//!
//! A file failing (after retries) is counted and the pass continues. Only a
//! failure to enumerate the root of the walk aborts a pass. A path outside
//! the local root fails that single operation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use ibridge_core::config::SyncConfig;
use ibridge_core::domain::paths::{relative_path, relative_remote_path, remote_parent, to_remote_path};
use ibridge_core::domain::{DomainError, SyncMode, SyncSummary, SyncTarget, TransferDirection};
use ibridge_core::ports::{IProgressObserver, IRemoteStorage, NoopProgress};

use crate::cache::ChangeCache;
use crate::ignore::IgnoreMatcher;
use crate::pool::{SyncStats, TaskOutcome, TransferPool, TransferTask};
use crate::retry::RetryPolicy;
use crate::watcher::ChangeHandler;
use crate::SyncError;

// ============================================================================
// FileOutcome
// ============================================================================

/// Result of a single-file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file was uploaded or downloaded
    Transferred,
    /// The remote counterpart was removed
    Deleted,
    /// The path matched an ignore rule; nothing was done
    Ignored,
}

/// What a tree walk collected
struct Walk<T> {
    found: Vec<T>,
    /// Left out of the pass, reported once the pass has started
    ignored: Vec<PathBuf>,
}

impl<T> Default for Walk<T> {
    fn default() -> Self {
        Self {
            found: Vec::new(),
            ignored: Vec::new(),
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Orchestrates directional passes and single-file operations for one target
pub struct SyncEngine {
    remote: Arc<dyn IRemoteStorage>,
    target: Arc<SyncTarget>,
    ignore: Arc<IgnoreMatcher>,
    cache: Arc<ChangeCache>,
    retry: Option<RetryPolicy>,
    pool: TransferPool,
    observer: Arc<dyn IProgressObserver>,
}

impl SyncEngine {
    /// Creates a new SyncEngine for `target`
    ///
    /// Concurrency, retry and cache retention come from `config`; progress
    /// goes nowhere until [`SyncEngine::with_observer`] is called.
    pub fn new(
        remote: Arc<dyn IRemoteStorage>,
        target: Arc<SyncTarget>,
        config: &SyncConfig,
    ) -> Self {
        let ignore = Arc::new(IgnoreMatcher::new(&target.ignore));
        let retry = config
            .enable_retry
            .then(|| RetryPolicy::from(&config.retry));

        Self {
            remote,
            ignore,
            target,
            cache: Arc::new(ChangeCache::with_max_age(Duration::from_secs(
                config.cache_max_age_secs,
            ))),
            retry,
            pool: TransferPool::new(config.max_concurrency),
            observer: Arc::new(NoopProgress),
        }
    }

    /// Route progress callbacks to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn IProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    /// Ignore rules compiled from the target, shared with the watcher
    pub fn ignore_matcher(&self) -> Arc<IgnoreMatcher> {
        Arc::clone(&self.ignore)
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    // ========================================================================
    // Full passes
    // ========================================================================

    /// Run one full pass in `mode` and return its summary
    ///
    /// Counters start at zero for every call.
    #[tracing::instrument(skip(self), fields(local = %self.target.local_root.display(), remote = %self.target.remote_root))]
    pub async fn run(&self, mode: SyncMode) -> Result<SyncSummary> {
        let started = Instant::now();
        let stats = SyncStats::new();

        info!(%mode, "Starting sync pass");

        match mode {
            SyncMode::Upload => self.upload_pass(mode, &stats).await?,
            SyncMode::Download => self.download_pass(mode, &stats).await?,
            SyncMode::Bidirectional => {
                self.download_pass(mode, &stats).await?;
                self.upload_pass(mode, &stats).await?;
            }
        }

        let summary = stats.snapshot(mode, started.elapsed());
        self.observer.on_pass_finished(&summary);

        info!(
            %mode,
            transferred = summary.transferred,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            errors = summary.errors,
            duration_ms = summary.duration_ms,
            "Sync pass completed"
        );

        Ok(summary)
    }

    /// Push every changed, non-ignored local file
    pub async fn upload_all(&self) -> Result<SyncSummary> {
        self.run(SyncMode::Upload).await
    }

    /// Pull every non-ignored remote file
    pub async fn download_all(&self) -> Result<SyncSummary> {
        self.run(SyncMode::Download).await
    }

    /// Pull everything, then push everything that changed
    pub async fn sync_bidirectional(&self) -> Result<SyncSummary> {
        self.run(SyncMode::Bidirectional).await
    }

    async fn upload_pass(&self, mode: SyncMode, stats: &SyncStats) -> Result<()> {
        let root = self.target.local_root.clone();
        let mut walk = Walk::default();
        self.walk_local(&root, &root, stats, &mut walk).await?;

        let tasks: Vec<TransferTask> = walk
            .found
            .into_iter()
            .filter_map(|path| {
                let rel = relative_path(&root, &path).ok()?;
                let remote = to_remote_path(&self.target.remote_root, &rel);
                Some(TransferTask::upload(path, remote))
            })
            .collect();

        debug!(candidates = tasks.len(), "Local walk finished");
        self.observer
            .on_pass_started(mode, TransferDirection::Upload, tasks.len());
        self.report_ignored(&walk.ignored);

        let remote = Arc::clone(&self.remote);
        let cache = Arc::clone(&self.cache);
        let retry = self.retry.clone();

        self.pool
            .run(tasks, stats, self.observer.as_ref(), move |task| {
                let remote = Arc::clone(&remote);
                let cache = Arc::clone(&cache);
                let retry = retry.clone();
                async move {
                    if !cache.has_changed(&task.local_path).await? {
                        return Ok(TaskOutcome::Skipped);
                    }
                    if let Err(err) = transfer(remote.as_ref(), retry.as_ref(), &task).await {
                        // the record was refreshed above; drop it so the next pass retries
                        cache.forget(&task.local_path);
                        return Err(err);
                    }
                    Ok(TaskOutcome::Transferred)
                }
            })
            .await;

        Ok(())
    }

    async fn download_pass(&self, mode: SyncMode, stats: &SyncStats) -> Result<()> {
        let mut walk = Walk::default();
        self.walk_remote(self.target.remote_root.clone(), String::new(), stats, &mut walk)
            .await?;
        let tasks = walk.found;

        debug!(candidates = tasks.len(), "Remote walk finished");
        self.observer
            .on_pass_started(mode, TransferDirection::Download, tasks.len());
        self.report_ignored(&walk.ignored);

        let remote = Arc::clone(&self.remote);
        let retry = self.retry.clone();

        self.pool
            .run(tasks, stats, self.observer.as_ref(), move |task| {
                let remote = Arc::clone(&remote);
                let retry = retry.clone();
                async move {
                    transfer(remote.as_ref(), retry.as_ref(), &task).await?;
                    Ok(TaskOutcome::Transferred)
                }
            })
            .await;

        Ok(())
    }

    fn report_ignored(&self, paths: &[PathBuf]) {
        for path in paths {
            self.observer.on_ignored(path);
        }
    }

    /// Collect non-ignored regular files below `dir`
    ///
    /// Ignored files and symlinks to directories are counted as skipped;
    /// ignored directories are pruned without being counted. Failing to read
    /// the root aborts the walk, a failing subdirectory only loses its own
    /// subtree.
    fn walk_local<'a>(
        &'a self,
        root: &'a Path,
        dir: &'a Path,
        stats: &'a SyncStats,
        walk: &'a mut Walk<PathBuf>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(source) if dir == root => {
                    return Err(SyncError::RootUnreadable {
                        path: dir.to_path_buf(),
                        source,
                    }
                    .into());
                }
                Err(e) => {
                    let msg = format!("{}: {e}", dir.display());
                    warn!(%msg, "Skipping unreadable directory");
                    stats.record_error(msg);
                    return Ok(());
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        let msg = format!("{}: {e}", dir.display());
                        warn!(%msg, "Directory listing interrupted");
                        stats.record_error(msg);
                        break;
                    }
                };

                let path = entry.path();
                let rel = match relative_path(root, &path) {
                    Ok(rel) => rel,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Entry outside sync root");
                        continue;
                    }
                };

                let is_dir = match entry.file_type().await {
                    Ok(ft) if ft.is_symlink() => false,
                    Ok(ft) => ft.is_dir(),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Cannot read file type");
                        stats.record_error(format!("{}: {e}", path.display()));
                        continue;
                    }
                };

                if self.ignore.should_ignore(&rel) {
                    if !is_dir {
                        stats.record_skipped();
                        walk.ignored.push(path);
                    }
                    debug!(path = %rel, "Ignored");
                    continue;
                }

                if is_dir {
                    self.walk_local(root, &path, stats, walk).await?;
                    continue;
                }
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => walk.found.push(path),
                    Ok(meta) if meta.is_dir() => {
                        debug!(path = %rel, "Not following directory symlink");
                        stats.record_skipped();
                        walk.ignored.push(path);
                    }
                    Ok(_) => debug!(path = %rel, "Skipping special file"),
                    Err(e) => debug!(path = %rel, error = %e, "Skipping dangling entry"),
                }
            }

            Ok(())
        })
    }

    /// Collect download tasks for every non-ignored remote file below `remote_dir`
    fn walk_remote<'a>(
        &'a self,
        remote_dir: String,
        rel_dir: String,
        stats: &'a SyncStats,
        walk: &'a mut Walk<TransferTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let entries = match self.remote.list_directory(&remote_dir).await {
                Ok(entries) => entries,
                Err(e) if rel_dir.is_empty() => {
                    return Err(e.context(format!("Failed to list remote root {remote_dir}")));
                }
                Err(e) => {
                    let msg = format!("{remote_dir}: {e:#}");
                    warn!(%msg, "Skipping unreadable remote directory");
                    stats.record_error(msg);
                    return Ok(());
                }
            };

            for entry in entries {
                if entry.name.is_empty() || entry.name == "." || entry.name == ".." {
                    continue;
                }

                let rel = if rel_dir.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{rel_dir}/{}", entry.name)
                };
                let local = self.target.local_root.join(&rel);

                if self.ignore.should_ignore(&rel) {
                    stats.record_skipped();
                    walk.ignored.push(local);
                    debug!(path = %rel, "Ignored");
                    continue;
                }

                let remote_path = to_remote_path(&remote_dir, &entry.name);
                if entry.is_dir {
                    self.walk_remote(remote_path, rel, stats, walk).await?;
                } else {
                    walk.found.push(TransferTask::download(remote_path, local));
                }
            }

            Ok(())
        })
    }

    // ========================================================================
    // Single-file operations
    // ========================================================================

    /// Upload one local file, bypassing the pool and the change cache
    #[tracing::instrument(skip(self), fields(path = %local_path.display()))]
    pub async fn sync_single_file(&self, local_path: &Path) -> Result<FileOutcome> {
        let rel = relative_path(&self.target.local_root, local_path)?;
        if self.ignore.should_ignore(&rel) {
            debug!(path = %rel, "Ignored");
            return Ok(FileOutcome::Ignored);
        }

        let task = TransferTask::upload(
            local_path.to_path_buf(),
            to_remote_path(&self.target.remote_root, &rel),
        );
        transfer(self.remote.as_ref(), self.retry.as_ref(), &task).await?;

        info!(path = %rel, remote = %task.remote_path, "Uploaded");
        Ok(FileOutcome::Transferred)
    }

    /// Remove the remote file mirroring `local_path`
    #[tracing::instrument(skip(self), fields(path = %local_path.display()))]
    pub async fn delete_remote_counterpart(&self, local_path: &Path) -> Result<FileOutcome> {
        let rel = relative_path(&self.target.local_root, local_path)?;
        if rel.is_empty() {
            return Err(DomainError::InvalidPath(format!(
                "refusing to delete the remote root for {}",
                local_path.display()
            ))
            .into());
        }
        if self.ignore.should_ignore(&rel) {
            return Ok(FileOutcome::Ignored);
        }

        let remote_path = to_remote_path(&self.target.remote_root, &rel);
        let label = format!("remove {remote_path}");
        let remote = self.remote.as_ref();
        let op = || {
            let remote_path = remote_path.as_str();
            async move { remote.remove(remote_path).await }
        };
        match &self.retry {
            Some(policy) => policy.run(&label, op).await?,
            None => op().await?,
        }

        self.cache.forget(local_path);
        info!(path = %rel, remote = %remote_path, "Deleted remote counterpart");
        Ok(FileOutcome::Deleted)
    }

    /// Download one remote file into its place under the local root
    #[tracing::instrument(skip(self))]
    pub async fn download_single_file(&self, remote_path: &str) -> Result<FileOutcome> {
        let rel = relative_remote_path(&self.target.remote_root, remote_path)?;
        if rel.is_empty() {
            return Err(DomainError::InvalidPath(format!(
                "{remote_path} is the remote root, not a file"
            ))
            .into());
        }
        if self.ignore.should_ignore(&rel) {
            return Ok(FileOutcome::Ignored);
        }

        let task = TransferTask::download(
            to_remote_path(&self.target.remote_root, &rel),
            self.target.local_root.join(&rel),
        );
        transfer(self.remote.as_ref(), self.retry.as_ref(), &task).await?;

        info!(path = %rel, "Downloaded");
        Ok(FileOutcome::Transferred)
    }
}

#[async_trait::async_trait]
impl ChangeHandler for SyncEngine {
    async fn sync_single_file(&self, path: &Path) -> Result<()> {
        SyncEngine::sync_single_file(self, path).await.map(|_| ())
    }

    async fn delete_remote_counterpart(&self, path: &Path) -> Result<()> {
        SyncEngine::delete_remote_counterpart(self, path)
            .await
            .map(|_| ())
    }
}

/// Perform one transfer, creating the destination's parent directory first
async fn transfer(
    remote: &dyn IRemoteStorage,
    retry: Option<&RetryPolicy>,
    task: &TransferTask,
) -> Result<()> {
    let op = || async move {
        match task.direction {
            TransferDirection::Upload => {
                if let Some(parent) = remote_parent(&task.remote_path) {
                    remote
                        .make_dir_all(&parent)
                        .await
                        .with_context(|| format!("Failed to create remote directory {parent}"))?;
                }
                remote.upload(&task.local_path, &task.remote_path).await
            }
            TransferDirection::Download => {
                if let Some(parent) = task.local_path.parent() {
                    tokio::fs::create_dir_all(parent).await.with_context(|| {
                        format!("Failed to create local directory {}", parent.display())
                    })?;
                }
                remote.download(&task.remote_path, &task.local_path).await
            }
        }
    };

    match retry {
        Some(policy) => {
            let label = format!("{} {}", task.direction, task.source());
            policy.run(&label, op).await
        }
        None => op().await,
    }
}
