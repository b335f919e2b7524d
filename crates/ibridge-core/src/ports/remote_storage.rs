//! Remote storage port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to talk to the
//! remote side. The shipped implementation runs commands over SSH, but the
//! engine only relies on the capability set below.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - One instance is shared by every concurrent transfer worker of a pass, so
//!   implementations must be safe for concurrent use from several tasks.
//! - Remote paths are `/`-separated strings in the remote host's convention.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// RemoteEntry
// ============================================================================

/// Metadata of one remote file or directory
///
/// Returned both by [`IRemoteStorage::stat`] and, per child, by
/// [`IRemoteStorage::list_directory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Final path segment
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time as reported by the remote host
    pub modified: Option<DateTime<Utc>>,
    /// Permission bits, when the remote reports them
    pub mode: Option<u32>,
}

impl RemoteEntry {
    /// Convenience constructor for a regular file entry
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            modified: None,
            mode: None,
        }
    }

    /// Convenience constructor for a directory entry
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
            modified: None,
            mode: None,
        }
    }
}

// ============================================================================
// IRemoteStorage trait
// ============================================================================

/// Port trait for remote file operations
///
/// All methods assume an already-established, authenticated connection.
///
/// ## Implementation Notes
///
/// - `upload` should carry over the local file's permission bits.
/// - `download` writes the whole file; partial transfers are not resumed.
/// - `remove` deletes a file or an empty directory.
#[async_trait::async_trait]
pub trait IRemoteStorage: Send + Sync {
    /// Copies a local file to the remote host
    ///
    /// # Arguments
    /// * `local_path` - Absolute path of the source file
    /// * `remote_path` - Destination path on the remote host
    async fn upload(&self, local_path: &Path, remote_path: &str) -> anyhow::Result<()>;

    /// Copies a remote file to the local filesystem
    ///
    /// # Arguments
    /// * `remote_path` - Source path on the remote host
    /// * `local_path` - Destination path; its parent directory is expected to exist
    async fn download(&self, remote_path: &str, local_path: &Path) -> anyhow::Result<()>;

    /// Creates a remote directory and all missing parents
    async fn make_dir_all(&self, remote_path: &str) -> anyhow::Result<()>;

    /// Removes a remote file or empty directory
    async fn remove(&self, remote_path: &str) -> anyhow::Result<()>;

    /// Returns metadata for a single remote path
    async fn stat(&self, remote_path: &str) -> anyhow::Result<RemoteEntry>;

    /// Lists the direct children of a remote directory
    async fn list_directory(&self, remote_path: &str) -> anyhow::Result<Vec<RemoteEntry>>;

    /// Runs a command on the remote host and returns its standard output
    async fn exec(&self, command: &str) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_constructors() {
        let file = RemoteEntry::file("a.txt", 12);
        assert!(!file.is_dir);
        assert_eq!(file.size, 12);

        let dir = RemoteEntry::dir("src");
        assert!(dir.is_dir);
        assert_eq!(dir.size, 0);
        assert!(dir.modified.is_none());
    }
}
