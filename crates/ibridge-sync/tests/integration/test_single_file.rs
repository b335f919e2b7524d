//! Single-file operations used by the watcher

use std::sync::Arc;

use ibridge_sync::{ChangeHandler, FileOutcome};

use crate::common::{self, InMemoryRemote, REMOTE_ROOT};

#[tokio::test]
async fn test_sync_single_file_creates_remote_parents() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "deep/er/file.rs", b"fn x() {}");

    let remote = InMemoryRemote::new();
    let engine = common::engine(local.path(), &remote, &[]);

    let outcome = engine
        .sync_single_file(&local.path().join("deep/er/file.rs"))
        .await
        .unwrap();

    assert_eq!(outcome, FileOutcome::Transferred);
    assert_eq!(
        remote.get(&format!("{REMOTE_ROOT}/deep/er/file.rs")).unwrap(),
        b"fn x() {}"
    );
}

#[tokio::test]
async fn test_sync_single_file_retries() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "a.txt", b"a");

    let remote = InMemoryRemote::new();
    let path = format!("{REMOTE_ROOT}/a.txt");
    remote.fail_times(&path, 2);

    let engine = common::engine(local.path(), &remote, &[]);
    engine
        .sync_single_file(&local.path().join("a.txt"))
        .await
        .unwrap();

    assert_eq!(remote.attempts(&path), 3);
}

#[tokio::test]
async fn test_sync_single_file_outside_root_is_an_item_error() {
    let local = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    common::write(other.path(), "stray.txt", b"?");

    let remote = InMemoryRemote::new();
    let engine = common::engine(local.path(), &remote, &[]);

    let err = engine
        .sync_single_file(&other.path().join("stray.txt"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not within sync root"), "got: {err}");
    assert_eq!(remote.file_count(), 0);

    // the engine keeps working afterwards
    common::write(local.path(), "ok.txt", b"ok");
    assert!(engine
        .sync_single_file(&local.path().join("ok.txt"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_delete_remote_counterpart_removes_mirror() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/notes/todo.md"), b"- x");

    let engine = common::engine(local.path(), &remote, &[]);
    let outcome = engine
        .delete_remote_counterpart(&local.path().join("notes/todo.md"))
        .await
        .unwrap();

    assert_eq!(outcome, FileOutcome::Deleted);
    assert!(!remote.contains(&format!("{REMOTE_ROOT}/notes/todo.md")));
}

#[tokio::test]
async fn test_delete_of_ignored_path_is_noop() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/cache.tmp"), b"t");

    let engine = common::engine(local.path(), &remote, &["*.tmp"]);
    let outcome = engine
        .delete_remote_counterpart(&local.path().join("cache.tmp"))
        .await
        .unwrap();

    assert_eq!(outcome, FileOutcome::Ignored);
    assert!(remote.contains(&format!("{REMOTE_ROOT}/cache.tmp")));
}

#[tokio::test]
async fn test_engine_as_change_handler() {
    let local = tempfile::tempdir().unwrap();
    common::write(local.path(), "x.txt", b"x");

    let remote = InMemoryRemote::new();
    let handler: Arc<dyn ChangeHandler> = Arc::new(common::engine(local.path(), &remote, &[]));

    handler
        .sync_single_file(&local.path().join("x.txt"))
        .await
        .unwrap();
    assert!(remote.contains(&format!("{REMOTE_ROOT}/x.txt")));

    handler
        .delete_remote_counterpart(&local.path().join("x.txt"))
        .await
        .unwrap();
    assert!(!remote.contains(&format!("{REMOTE_ROOT}/x.txt")));

    // deleting something the remote never had surfaces the error
    assert!(handler
        .delete_remote_counterpart(&local.path().join("missing.txt"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_download_single_file() {
    let local = tempfile::tempdir().unwrap();
    let remote = InMemoryRemote::new();
    remote.put(&format!("{REMOTE_ROOT}/conf/app.toml"), b"port = 80");

    let engine = common::engine(local.path(), &remote, &[]);
    engine
        .download_single_file(&format!("{REMOTE_ROOT}/conf/app.toml"))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(local.path().join("conf/app.toml")).unwrap(),
        b"port = 80"
    );
}
