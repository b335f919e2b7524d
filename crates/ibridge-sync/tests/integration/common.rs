//! Shared helpers: an in-memory `IRemoteStorage` and engine construction

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};

use ibridge_core::config::SyncConfig;
use ibridge_core::domain::paths::remote_parent;
use ibridge_core::domain::SyncTarget;
use ibridge_core::ports::{IRemoteStorage, RemoteEntry};
use ibridge_sync::SyncEngine;

pub const REMOTE_ROOT: &str = "/srv/project";

/// Remote tree held in memory
///
/// Paths that were given a failure budget with [`InMemoryRemote::fail_times`]
/// fail that many transfers before succeeding.
#[derive(Default)]
pub struct InMemoryRemote {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    failures: Mutex<HashMap<String, u32>>,
    attempts: Mutex<HashMap<String, u32>>,
    pub uploads: AtomicU32,
    pub downloads: AtomicU32,
}

impl InMemoryRemote {
    pub fn new() -> Arc<Self> {
        let remote = Self::default();
        remote.dirs.lock().unwrap().insert(REMOTE_ROOT.to_string());
        Arc::new(remote)
    }

    /// Place a file, creating its parent directories
    pub fn put(&self, path: &str, content: &[u8]) {
        self.mkdirs(path);
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Make the next `n` transfers touching `path` fail
    pub fn fail_times(&self, path: &str, n: u32) {
        self.failures.lock().unwrap().insert(path.to_string(), n);
    }

    /// Transfers attempted against `path`, failed ones included
    pub fn attempts(&self, path: &str) -> u32 {
        self.attempts.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn mkdirs(&self, path: &str) {
        let mut dirs = self.dirs.lock().unwrap();
        let mut current = remote_parent(path);
        while let Some(dir) = current {
            if !dirs.insert(dir.clone()) {
                break;
            }
            current = remote_parent(&dir);
        }
    }

    fn attempt(&self, path: &str) -> Result<()> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default() += 1;

        let mut failures = self.failures.lock().unwrap();
        if let Some(left) = failures.get_mut(path) {
            if *left > 0 {
                *left -= 1;
                bail!("simulated transfer failure for {path}");
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IRemoteStorage for InMemoryRemote {
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        self.attempt(remote_path)?;
        if let Some(parent) = remote_parent(remote_path) {
            if !self.dirs.lock().unwrap().contains(&parent) {
                bail!("parent directory {parent} does not exist");
            }
        }
        let content = tokio::fs::read(local_path).await?;
        self.files
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), content);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        self.attempt(remote_path)?;
        let content = self
            .get(remote_path)
            .ok_or_else(|| anyhow!("no such file: {remote_path}"))?;
        tokio::fs::write(local_path, content).await?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn make_dir_all(&self, remote_path: &str) -> Result<()> {
        self.mkdirs(&format!("{remote_path}/x"));
        Ok(())
    }

    async fn remove(&self, remote_path: &str) -> Result<()> {
        if self.files.lock().unwrap().remove(remote_path).is_some() {
            return Ok(());
        }
        bail!("no such file: {remote_path}")
    }

    async fn stat(&self, remote_path: &str) -> Result<RemoteEntry> {
        let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        if let Some(content) = self.get(remote_path) {
            return Ok(RemoteEntry::file(name, content.len() as u64));
        }
        if self.dirs.lock().unwrap().contains(remote_path) {
            return Ok(RemoteEntry::dir(name));
        }
        bail!("no such file or directory: {remote_path}")
    }

    async fn list_directory(&self, remote_path: &str) -> Result<Vec<RemoteEntry>> {
        if !self.dirs.lock().unwrap().contains(remote_path) {
            bail!("no such directory: {remote_path}");
        }
        let prefix = format!("{remote_path}/");

        let mut entries: Vec<RemoteEntry> = self
            .dirs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|d| child_name(&prefix, d).map(RemoteEntry::dir))
            .collect();
        entries.extend(self.files.lock().unwrap().iter().filter_map(|(p, c)| {
            child_name(&prefix, p).map(|n| RemoteEntry::file(n, c.len() as u64))
        }));
        Ok(entries)
    }

    async fn exec(&self, command: &str) -> Result<String> {
        Ok(format!("ran: {command}"))
    }
}

fn child_name<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix(prefix).filter(|rest| !rest.contains('/'))
}

/// Sync settings with retries fast enough for tests
pub fn fast_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.retry.initial_delay_ms = 5;
    config.retry.max_delay_ms = 20;
    config
}

pub fn engine(local: &Path, remote: &Arc<InMemoryRemote>, ignore: &[&str]) -> SyncEngine {
    engine_with(local, remote, ignore, &fast_config())
}

pub fn engine_with(
    local: &Path,
    remote: &Arc<InMemoryRemote>,
    ignore: &[&str],
    config: &SyncConfig,
) -> SyncEngine {
    let target = SyncTarget::new(local, REMOTE_ROOT).with_ignore(ignore.iter().copied());
    let remote: Arc<dyn IRemoteStorage> = Arc::clone(remote) as Arc<dyn IRemoteStorage>;
    SyncEngine::new(remote, Arc::new(target), config)
}

pub fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
