//! Filesystem watcher with debounced dispatch
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │  (notify callback thread)
//!       ├──→ events channel ──┐
//!       └──→ errors channel ──┤
//!                             ▼
//!                        WatchLoop (owns PendingEvents + debounce timer)
//!                             │  timer fires: swap pending set out
//!                             ▼
//!                        batch channel ──→ dispatcher task ──→ ChangeHandler
//! ```
//!
//! The loop task is the only owner of the pending set. The debounce timer is
//! a select branch of that same task, so flushing needs no locking. Flushed
//! batches are queued to a single dispatcher task and handled strictly in
//! flush order, while the loop keeps receiving. A delete flushed after an
//! upload of the same path therefore never overtakes it.
//!
//! Directories are registered individually at start. A directory created
//! afterwards is not picked up until the watcher is rebuilt.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ibridge_core::domain::paths::relative_path;
use ibridge_core::domain::{SyncMode, SyncSummary, SyncTarget, TransferDirection};

use crate::ignore::IgnoreMatcher;
use crate::pool::SyncStats;
use crate::SyncError;

/// Default quiet period before pending changes are dispatched
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const CHANNEL_CAPACITY: usize = 1024;

// ============================================================================
// WatchEvent
// ============================================================================

/// Kind of change observed on a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOp {
    Write,
    Create,
    Remove,
    Rename,
}

impl WatchOp {
    /// Whether this change means the path's content should be pushed
    pub fn is_content_change(self) -> bool {
        matches!(self, WatchOp::Write | WatchOp::Create)
    }
}

/// One path-level change, decoupled from the `notify` event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub op: WatchOp,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, op: WatchOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// Convert a raw `notify` event into zero or more [`WatchEvent`]s
///
/// - `Create(*)` -> `Create`
/// - `Modify(Data | Any | Other)` -> `Write`
/// - `Modify(Name(Both))` -> `Rename` of the old path, `Create` of the new
/// - `Modify(Name(From))` -> `Rename`, `Modify(Name(To))` -> `Create`
/// - `Modify(Name(Any | Other))` -> `Create` if the path exists, else `Rename`
/// - `Remove(*)` -> `Remove`
///
/// Metadata changes and access events produce nothing.
pub fn map_notify_event(event: &notify::Event) -> Vec<WatchEvent> {
    let each = |op: WatchOp| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .map(|p| WatchEvent::new(p.clone(), op))
            .collect()
    };

    match &event.kind {
        EventKind::Create(_) => each(WatchOp::Create),
        EventKind::Remove(_) => each(WatchOp::Remove),
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => each(WatchOp::Write),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [old, new, ..] => vec![
                WatchEvent::new(old.clone(), WatchOp::Rename),
                WatchEvent::new(new.clone(), WatchOp::Create),
            ],
            _ => each(WatchOp::Rename),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(WatchOp::Rename),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(WatchOp::Create),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let op = if p.exists() {
                    WatchOp::Create
                } else {
                    WatchOp::Rename
                };
                WatchEvent::new(p.clone(), op)
            })
            .collect(),
        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            Vec::new()
        }
    }
}

// ============================================================================
// PendingEvents
// ============================================================================

/// Changes awaiting the debounce timer, keyed by path
///
/// A later change on a path replaces the earlier one.
#[derive(Debug, Default)]
struct PendingEvents {
    by_path: HashMap<PathBuf, WatchOp>,
}

impl PendingEvents {
    fn insert(&mut self, event: WatchEvent) {
        self.by_path.insert(event.path, event.op);
    }

    /// Swap the whole set out, leaving it empty
    fn take(&mut self) -> Vec<WatchEvent> {
        std::mem::take(&mut self.by_path)
            .into_iter()
            .map(|(path, op)| WatchEvent { path, op })
            .collect()
    }

    fn len(&self) -> usize {
        self.by_path.len()
    }

    fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

// ============================================================================
// ChangeHandler
// ============================================================================

/// Receiver of debounced changes
#[async_trait::async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Push the current content of `path`
    async fn sync_single_file(&self, path: &Path) -> Result<()>;

    /// Remove the remote file mirroring `path`
    async fn delete_remote_counterpart(&self, path: &Path) -> Result<()>;
}

// ============================================================================
// ChangeWatcher
// ============================================================================

/// Watches every non-ignored directory of a sync target
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Event>,
    errors: mpsc::Receiver<notify::Error>,
    root: PathBuf,
    ignore: Arc<IgnoreMatcher>,
    debounce: Duration,
    watched: usize,
}

impl ChangeWatcher {
    /// Create the OS watcher and register the target's directories
    ///
    /// # Errors
    /// Fails when the backend cannot be created, when the root cannot be
    /// enumerated, or when a directory cannot be registered.
    pub fn new(
        target: &SyncTarget,
        ignore: Arc<IgnoreMatcher>,
        debounce: Duration,
    ) -> Result<Self, SyncError> {
        let (event_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, errors) = mpsc::channel(CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if event_tx.blocking_send(event).is_err() {
                        debug!("Event receiver dropped");
                    }
                }
                Err(err) => {
                    if error_tx.blocking_send(err).is_err() {
                        debug!("Error receiver dropped");
                    }
                }
            },
            notify::Config::default(),
        )?;

        let root = target.local_root.clone();
        let mut dirs = Vec::new();
        collect_watch_dirs(&root, &root, &ignore, &mut dirs)?;

        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        info!(
            root = %root.display(),
            directories = dirs.len(),
            debounce_ms = debounce.as_millis() as u64,
            "Watching for changes"
        );

        Ok(Self {
            watcher,
            events,
            errors,
            root,
            ignore,
            debounce,
            watched: dirs.len(),
        })
    }

    /// Number of directories registered at start
    pub fn watched_dirs(&self) -> usize {
        self.watched
    }

    /// Consume notifications until `shutdown` is cancelled
    ///
    /// Finishes batches already flushed before returning. Changes
    /// still inside their debounce window at shutdown are dropped.
    ///
    /// Returns the counters of the whole session: uploads, remote deletions
    /// and failed uploads.
    pub async fn run(
        self,
        handler: Arc<dyn ChangeHandler>,
        shutdown: CancellationToken,
    ) -> SyncSummary {
        let Self {
            watcher,
            events,
            errors,
            root,
            ignore,
            debounce,
            ..
        } = self;

        let summary = WatchLoop {
            root,
            ignore,
            debounce,
            handler,
        }
        .run(events, errors, shutdown)
        .await;

        drop(watcher);
        info!(
            uploaded = summary.transferred,
            deleted = summary.deleted,
            errors = summary.errors,
            "Watcher stopped"
        );
        summary
    }
}

/// Depth-first list of directories to register, pruning ignored subtrees
fn collect_watch_dirs(
    root: &Path,
    dir: &Path,
    ignore: &IgnoreMatcher,
    out: &mut Vec<PathBuf>,
) -> Result<(), SyncError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) if dir == root => {
            return Err(SyncError::RootUnreadable {
                path: dir.to_path_buf(),
                source,
            });
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot enumerate directory, not watching it");
            return Ok(());
        }
    };
    out.push(dir.to_path_buf());

    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let path = entry.path();
        let rel = relative_path(root, &path)?;
        if ignore.should_ignore(&rel) {
            debug!(path = %rel, "Not watching ignored directory");
            continue;
        }
        collect_watch_dirs(root, &path, ignore, out)?;
    }

    Ok(())
}

// ============================================================================
// WatchLoop
// ============================================================================

struct WatchLoop {
    root: PathBuf,
    ignore: Arc<IgnoreMatcher>,
    debounce: Duration,
    handler: Arc<dyn ChangeHandler>,
}

impl WatchLoop {
    async fn run(
        &self,
        mut events: mpsc::Receiver<notify::Event>,
        mut errors: mpsc::Receiver<notify::Error>,
        shutdown: CancellationToken,
    ) -> SyncSummary {
        let started = std::time::Instant::now();
        let mut pending = PendingEvents::default();
        let (batches, queued) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(run_dispatcher(Arc::clone(&self.handler), queued));
        let timer = tokio::time::sleep(self.debounce);
        tokio::pin!(timer);
        let mut armed = false;
        let mut errors_open = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    if !pending.is_empty() {
                        debug!(pending = pending.len(), "Dropping undispatched changes");
                    }
                    break;
                }
                received = events.recv() => match received {
                    Some(event) => {
                        for change in map_notify_event(&event) {
                            if self.accepts(&change) {
                                pending.insert(change);
                                timer.as_mut().reset(Instant::now() + self.debounce);
                                armed = true;
                            }
                        }
                    }
                    None => {
                        debug!("Event channel closed");
                        if !pending.is_empty() {
                            self.flush(&mut pending, &batches);
                        }
                        break;
                    }
                },
                received = errors.recv(), if errors_open => match received {
                    Some(err) => warn!(error = %err, "Watcher error"),
                    None => errors_open = false,
                },
                _ = &mut timer, if armed => {
                    armed = false;
                    self.flush(&mut pending, &batches);
                }
            }
        }

        // the dispatcher drains what was already queued, then exits
        drop(batches);
        let stats = match dispatcher.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Dispatcher task panicked");
                SyncStats::new()
            }
        };
        stats.snapshot(SyncMode::Upload, started.elapsed())
    }

    /// Whether a change belongs to the target and is not ignored
    fn accepts(&self, change: &WatchEvent) -> bool {
        match relative_path(&self.root, &change.path) {
            Ok(rel) if rel.is_empty() => false,
            Ok(rel) => !self.ignore.should_ignore(&rel),
            Err(e) => {
                debug!(path = %change.path.display(), error = %e, "Dropping event outside root");
                false
            }
        }
    }

    fn flush(&self, pending: &mut PendingEvents, batches: &mpsc::UnboundedSender<Vec<WatchEvent>>) {
        let batch = pending.take();
        if batch.is_empty() {
            return;
        }
        debug!(changes = batch.len(), "Queueing debounced changes");
        if batches.send(batch).is_err() {
            error!("Dispatcher stopped, dropping changes");
        }
    }
}

/// Handle queued batches one after another
async fn run_dispatcher(
    handler: Arc<dyn ChangeHandler>,
    mut queued: mpsc::UnboundedReceiver<Vec<WatchEvent>>,
) -> SyncStats {
    let stats = SyncStats::new();
    while let Some(batch) = queued.recv().await {
        dispatch(handler.as_ref(), batch, &stats).await;
    }
    stats
}

async fn dispatch(handler: &dyn ChangeHandler, batch: Vec<WatchEvent>, stats: &SyncStats) {
    for WatchEvent { path, op } in batch {
        if op.is_content_change() {
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => {
                    debug!(path = %path.display(), "Directory change, nothing to push");
                }
                Ok(_) => match handler.sync_single_file(&path).await {
                    Ok(()) => stats.record_transferred(TransferDirection::Upload),
                    Err(e) => {
                        let msg = format!("{}: {e:#}", path.display());
                        error!(%msg, "Sync failed");
                        stats.record_error(msg);
                    }
                },
                Err(_) => {
                    debug!(path = %path.display(), "Path vanished before dispatch");
                }
            }
        } else {
            match handler.delete_remote_counterpart(&path).await {
                Ok(()) => stats.record_deleted(),
                Err(e) => {
                    debug!(path = %path.display(), error = %format!("{e:#}"), "Remote delete failed");
                }
            }
        }
    }
}
