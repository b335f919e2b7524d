//! Sync target and direction types
//!
//! A [`SyncTarget`] is the immutable description of one local/remote pair
//! that an engine instance works on. [`SyncMode`] selects which directional
//! pass runs; [`TransferDirection`] tags a single file transfer.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::paths::resolve_local_base;
use crate::config::Project;

// ============================================================================
// SyncMode
// ============================================================================

/// Direction of a full sync pass
///
/// Serialized as `upload` / `download` / `bidirectional`; the older
/// `one-way-local` / `one-way-remote` / `two-way` spellings are accepted
/// when reading configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Push the local tree to the remote
    #[default]
    #[serde(alias = "one-way-local")]
    Upload,
    /// Pull the remote tree to the local side
    #[serde(alias = "one-way-remote")]
    Download,
    /// Pull, then push
    #[serde(alias = "two-way", alias = "both")]
    Bidirectional,
}

impl SyncMode {
    /// Lenient mapping used for project modes: unknown or empty strings
    /// fall back to [`SyncMode::Upload`].
    pub fn from_mode_str(mode: &str) -> Self {
        mode.parse().unwrap_or_default()
    }

    /// The string used in configuration files and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Upload => "upload",
            SyncMode::Download => "download",
            SyncMode::Bidirectional => "bidirectional",
        }
    }
}

impl Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" | "up" | "push" | "one-way-local" => Ok(SyncMode::Upload),
            "download" | "down" | "pull" | "one-way-remote" => Ok(SyncMode::Download),
            "both" | "bidirectional" | "two-way" => Ok(SyncMode::Bidirectional),
            other => Err(DomainError::InvalidSyncMode(other.to_string())),
        }
    }
}

// ============================================================================
// TransferDirection
// ============================================================================

/// Direction tag of a single file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    Upload,
    Download,
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Upload => f.write_str("upload"),
            TransferDirection::Download => f.write_str("download"),
        }
    }
}

// ============================================================================
// SyncTarget
// ============================================================================

/// One local tree paired with one remote tree
///
/// Owned by the caller and shared read-only with the engine and the watcher
/// for their whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    /// Absolute, cleaned local root
    pub local_root: PathBuf,
    /// Remote root in the remote host's `/` convention
    pub remote_root: String,
    /// Ignore glob patterns, in configuration order
    pub ignore: Vec<String>,
    /// Default direction when the caller does not pick one
    pub mode: SyncMode,
    /// Whether continuous watching is enabled for this target
    pub watch: bool,
}

impl SyncTarget {
    /// Creates a target rooted at an explicit local path
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            ignore: Vec::new(),
            mode: SyncMode::default(),
            watch: false,
        }
    }

    /// Sets the ignore patterns
    pub fn with_ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default sync mode
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builds a target from a configured project, resolving the local path
    /// against `cwd`.
    pub fn from_project(project: &Project, cwd: &Path) -> Self {
        Self {
            local_root: resolve_local_base(&project.local_path, cwd),
            remote_root: project.remote_path.clone(),
            ignore: project.ignore.clone(),
            mode: project.mode,
            watch: project.watch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_from_str_aliases() {
        for s in ["upload", "up", "push", "UP"] {
            assert_eq!(s.parse::<SyncMode>().unwrap(), SyncMode::Upload);
        }
        for s in ["download", "down", "pull"] {
            assert_eq!(s.parse::<SyncMode>().unwrap(), SyncMode::Download);
        }
        for s in ["both", "bidirectional", "two-way"] {
            assert_eq!(s.parse::<SyncMode>().unwrap(), SyncMode::Bidirectional);
        }
        assert!("sideways".parse::<SyncMode>().is_err());
    }

    #[test]
    fn test_from_mode_str_defaults_to_upload() {
        assert_eq!(SyncMode::from_mode_str("one-way-local"), SyncMode::Upload);
        assert_eq!(SyncMode::from_mode_str("one-way-remote"), SyncMode::Download);
        assert_eq!(SyncMode::from_mode_str("two-way"), SyncMode::Bidirectional);
        assert_eq!(SyncMode::from_mode_str(""), SyncMode::Upload);
        assert_eq!(SyncMode::from_mode_str("unknown"), SyncMode::Upload);
    }

    #[test]
    fn test_sync_mode_serde_accepts_legacy_names() {
        let mode: SyncMode = serde_json::from_str("\"two-way\"").unwrap();
        assert_eq!(mode, SyncMode::Bidirectional);
        let mode: SyncMode = serde_json::from_str("\"one-way-remote\"").unwrap();
        assert_eq!(mode, SyncMode::Download);
        assert_eq!(
            serde_json::to_string(&SyncMode::Bidirectional).unwrap(),
            "\"bidirectional\""
        );
    }

    #[test]
    fn test_target_from_project() {
        let project = Project {
            name: "web".into(),
            profile: "dev".into(),
            local_path: "./site".into(),
            remote_path: "/srv/web".into(),
            mode: SyncMode::Bidirectional,
            watch: true,
            ignore: vec![".git".into()],
        };

        let target = SyncTarget::from_project(&project, Path::new("/home/me"));
        assert_eq!(target.local_root, PathBuf::from("/home/me/site"));
        assert_eq!(target.remote_root, "/srv/web");
        assert_eq!(target.ignore, vec![".git".to_string()]);
        assert_eq!(target.mode, SyncMode::Bidirectional);
        assert!(target.watch);
    }
}
