//! Full upload, download and bidirectional passes

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ibridge_core::domain::{SyncMode, SyncSummary, TransferDirection};
use ibridge_core::ports::IProgressObserver;

use crate::common::{self, InMemoryRemote, REMOTE_ROOT};

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_skips_ignored_file() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "main.go", b"package main");
    common::write(local.path(), "docs/readme.md", b"# docs");
    common::write(local.path(), "server.log", b"noise");

    let remote = InMemoryRemote::new();
    let engine = common::engine(local.path(), &remote, &["*.log"]);

    let summary = engine.upload_all().await.unwrap();

    assert_eq!(summary.transferred, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(
        remote.get(&format!("{REMOTE_ROOT}/docs/readme.md")).unwrap(),
        b"# docs"
    );
    assert!(!remote.contains(&format!("{REMOTE_ROOT}/server.log")));
}

#[cfg(unix)]
#[tokio::test]
async fn test_directory_symlink_is_counted_as_skipped() {
    let local = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    common::write(local.path(), "a.txt", b"a");
    common::write(elsewhere.path(), "secret.txt", b"outside");
    std::os::unix::fs::symlink(elsewhere.path(), local.path().join("linked")).unwrap();

    let remote = InMemoryRemote::new();
    let engine = common::engine(local.path(), &remote, &[]);

    let summary = engine.upload_all().await.unwrap();

    assert_eq!(summary.transferred, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, 0);
    assert!(!remote.contains(&format!("{REMOTE_ROOT}/linked/secret.txt")));
}

#[tokio::test]
async fn test_upload_only_sends_changed_files() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "a.txt", b"one");
    common::write(local.path(), "b.txt", b"two");

    let remote = InMemoryRemote::new();
    let engine = common::engine(local.path(), &remote, &[]);

    assert_eq!(engine.upload_all().await.unwrap().transferred, 2);

    common::write(local.path(), "b.txt", b"two, edited");
    let second = engine.upload_all().await.unwrap();
    assert_eq!(second.transferred, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(
        remote.get(&format!("{REMOTE_ROOT}/b.txt")).unwrap(),
        b"two, edited"
    );
}

#[tokio::test]
async fn test_failed_upload_is_retried_next_pass() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "flaky.bin", b"data");

    let remote = InMemoryRemote::new();
    let target = format!("{REMOTE_ROOT}/flaky.bin");
    remote.fail_times(&target, 3);

    let engine = common::engine(local.path(), &remote, &[]);

    let first = engine.upload_all().await.unwrap();
    assert_eq!(first.transferred, 0);
    assert_eq!(first.errors, 1);
    assert!(first.error_messages[0].contains("failed after 3 attempts"));

    // the file did not change, but its failed transfer must not be forgotten
    let second = engine.upload_all().await.unwrap();
    assert_eq!(second.transferred, 1);
    assert_eq!(second.errors, 0);
    assert_eq!(remote.attempts(&target), 4);
}

#[tokio::test]
async fn test_upload_without_retry_attempts_once() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "x.txt", b"x");

    let remote = InMemoryRemote::new();
    let target = format!("{REMOTE_ROOT}/x.txt");
    remote.fail_times(&target, 1);

    let mut config = common::fast_config();
    config.enable_retry = false;
    let engine = common::engine_with(local.path(), &remote, &[], &config);

    let summary = engine.upload_all().await.unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(remote.attempts(&target), 1);
}

#[tokio::test]
async fn test_many_files_with_small_pool() {
    let local = tempfile::tempdir().unwrap();
    for i in 0..40 {
        common::write(local.path(), &format!("dir{}/file{i}.txt", i % 4), b"payload");
    }

    let remote = InMemoryRemote::new();
    let mut config = common::fast_config();
    config.max_concurrency = 3;
    let engine = common::engine_with(local.path(), &remote, &[], &config);

    let summary = engine.upload_all().await.unwrap();
    assert_eq!(summary.transferred, 40);
    assert_eq!(remote.file_count(), 40);
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn test_download_retries_until_success() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    let path = format!("{REMOTE_ROOT}/data/report.csv");
    remote.put(&path, b"a,b,c");
    remote.fail_times(&path, 2);

    let engine = common::engine(local.path(), &remote, &[]);
    let summary = engine.download_all().await.unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(remote.attempts(&path), 3);
    assert_eq!(
        std::fs::read(local.path().join("data/report.csv")).unwrap(),
        b"a,b,c"
    );
}

#[tokio::test]
async fn test_download_prunes_ignored_remote_directory() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/src/app.py"), b"print()");
    remote.put(&format!("{REMOTE_ROOT}/node_modules/pkg/index.js"), b"x");
    remote.put(&format!("{REMOTE_ROOT}/node_modules/pkg/lib.js"), b"y");

    let engine = common::engine(local.path(), &remote, &["node_modules"]);
    let summary = engine.download_all().await.unwrap();

    assert_eq!(summary.downloaded, 1);
    // the pruned directory counts once
    assert_eq!(summary.skipped, 1);
    assert!(!local.path().join("node_modules").exists());
}

#[tokio::test]
async fn test_download_always_refetches() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/a.txt"), b"a");

    let engine = common::engine(local.path(), &remote, &[]);
    engine.download_all().await.unwrap();
    let second = engine.download_all().await.unwrap();

    assert_eq!(second.downloaded, 1);
    assert_eq!(remote.downloads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_download_error_is_counted_not_fatal() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    let broken = format!("{REMOTE_ROOT}/broken.bin");
    remote.put(&broken, b"?");
    remote.put(&format!("{REMOTE_ROOT}/fine.bin"), b"!");
    remote.fail_times(&broken, 10);

    let engine = common::engine(local.path(), &remote, &[]);
    let summary = engine.download_all().await.unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(remote.attempts(&broken), 3);
}

// ============================================================================
// Bidirectional
// ============================================================================

#[tokio::test]
async fn test_bidirectional_converges_both_sides() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "b", b"local b");

    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/a"), b"remote a");

    let engine = common::engine(local.path(), &remote, &[]);
    let summary = engine.sync_bidirectional().await.unwrap();

    assert_eq!(summary.mode, SyncMode::Bidirectional);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.errors, 0);

    assert_eq!(std::fs::read(local.path().join("a")).unwrap(), b"remote a");
    assert_eq!(std::fs::read(local.path().join("b")).unwrap(), b"local b");
    assert_eq!(remote.get(&format!("{REMOTE_ROOT}/a")).unwrap(), b"remote a");
    assert_eq!(remote.get(&format!("{REMOTE_ROOT}/b")).unwrap(), b"local b");
}

#[tokio::test]
async fn test_bidirectional_pull_precedes_push() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "shared.txt", b"local");

    let remote = InMemoryRemote::new();
    let path = format!("{REMOTE_ROOT}/shared.txt");
    remote.put(&path, b"remote");

    let engine = common::engine(local.path(), &remote, &[]);
    engine.run(SyncMode::Bidirectional).await.unwrap();

    // the pull overwrote the local copy, which the push then sent back
    assert_eq!(std::fs::read(local.path().join("shared.txt")).unwrap(), b"remote");
    assert_eq!(remote.get(&path).unwrap(), b"remote");
}

// ============================================================================
// Observer
// ============================================================================

#[derive(Default)]
struct Tally {
    started: AtomicU64,
    total: AtomicU64,
    transferred: AtomicU64,
    skipped: AtomicU64,
    ignored: AtomicU64,
    ignored_before_start: AtomicU64,
    finished: AtomicU64,
}

impl IProgressObserver for Tally {
    fn on_pass_started(&self, _mode: SyncMode, _direction: TransferDirection, total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(total as u64, Ordering::SeqCst);
    }

    fn on_transferred(&self, _path: &Path, _direction: TransferDirection) {
        self.transferred.fetch_add(1, Ordering::SeqCst);
    }

    fn on_skipped(&self, _path: &Path) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn on_ignored(&self, _path: &Path) {
        if self.started.load(Ordering::SeqCst) == 0 {
            self.ignored_before_start.fetch_add(1, Ordering::SeqCst);
        }
        self.ignored.fetch_add(1, Ordering::SeqCst);
    }

    fn on_pass_finished(&self, _summary: &SyncSummary) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_observer_receives_progress() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "one.txt", b"1");
    common::write(local.path(), "two.tmp", b"2");

    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/three.txt"), b"3");

    let tally = Arc::new(Tally::default());
    let engine = common::engine(local.path(), &remote, &["*.tmp"])
        .with_observer(Arc::clone(&tally) as Arc<dyn IProgressObserver>);

    engine.sync_bidirectional().await.unwrap();

    assert_eq!(tally.started.load(Ordering::SeqCst), 2);
    assert_eq!(tally.finished.load(Ordering::SeqCst), 1);
    // three.txt down, then one.txt and three.txt up
    assert_eq!(tally.transferred.load(Ordering::SeqCst), 3);
    assert_eq!(tally.skipped.load(Ordering::SeqCst), 0);
    assert_eq!(tally.ignored.load(Ordering::SeqCst), 1);
    assert_eq!(tally.ignored_before_start.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unchanged_files_complete_the_pass_total() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "a.txt", b"a");
    common::write(local.path(), "b.txt", b"b");
    common::write(local.path(), "c.log", b"c");

    let remote = InMemoryRemote::new();
    let tally = Arc::new(Tally::default());
    let engine = common::engine(local.path(), &remote, &["*.log"])
        .with_observer(Arc::clone(&tally) as Arc<dyn IProgressObserver>);

    engine.upload_all().await.unwrap();
    engine.upload_all().await.unwrap();

    // both passes schedule a.txt and b.txt; the second finds them unchanged
    assert_eq!(tally.total.load(Ordering::SeqCst), 4);
    assert_eq!(
        tally.transferred.load(Ordering::SeqCst) + tally.skipped.load(Ordering::SeqCst),
        4
    );
    assert_eq!(tally.skipped.load(Ordering::SeqCst), 2);
    assert_eq!(tally.ignored.load(Ordering::SeqCst), 2);
}
