//! Path mapping between the local tree and the remote tree
//!
//! Local paths are handled as [`Path`]s and normalised lexically (the file
//! may not exist yet, so nothing here touches the filesystem). Remote paths
//! are plain `/`-separated strings in the convention of the remote host.
//!
//! Relative paths produced here always use `/` as separator, so the same
//! string can be fed to the ignore matcher and joined onto a remote root.

use std::path::{Component, Path, PathBuf};

use super::errors::DomainError;

/// Lexically normalise a local path, resolving `.` and `..` components.
///
/// A `..` that would climb above the root of an absolute path is dropped;
/// on a relative path it is kept.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => normalized.push(p.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(c) => normalized.push(c),
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Resolve a project's configured local path against the working directory.
///
/// `""`, `"."` and `"./"` resolve to `cwd` itself; other relative paths are
/// joined onto `cwd`. The result is always cleaned.
pub fn resolve_local_base(local_path: &str, cwd: &Path) -> PathBuf {
    match local_path {
        "" | "." | "./" => clean_path(cwd),
        other => {
            let path = Path::new(other);
            if path.is_absolute() {
                clean_path(path)
            } else {
                clean_path(&cwd.join(path))
            }
        }
    }
}

/// Compute `path` relative to `root`, using `/` separators.
///
/// Returns an empty string when `path` is the root itself.
///
/// # Errors
/// Returns [`DomainError::PathNotInSyncRoot`] when `path` lies outside `root`.
pub fn relative_path(root: &Path, path: &Path) -> Result<String, DomainError> {
    let root = clean_path(root);
    let path = clean_path(path);

    let rel = path.strip_prefix(&root).map_err(|_| {
        DomainError::PathNotInSyncRoot(format!(
            "{} is not within {}",
            path.display(),
            root.display()
        ))
    })?;

    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(segments.join("/"))
}

/// Join a relative path onto a remote root, normalising separators to `/`.
pub fn to_remote_path(remote_root: &str, rel: &str) -> String {
    let joined = format!("{}/{}", remote_root, rel).replace('\\', "/");
    clean_remote(&joined)
}

/// Inverse of [`to_remote_path`]: the part of `full` below `remote_root`.
///
/// Tolerates a trailing slash on the root. Returns an empty string when
/// `full` is the root itself.
///
/// # Errors
/// Returns [`DomainError::PathNotInSyncRoot`] when `full` lies outside the root.
pub fn relative_remote_path(remote_root: &str, full: &str) -> Result<String, DomainError> {
    let root = clean_remote(remote_root);
    let full = clean_remote(full);

    if full == root {
        return Ok(String::new());
    }

    let prefix = if root.ends_with('/') {
        root.clone()
    } else {
        format!("{root}/")
    };

    full.strip_prefix(&prefix)
        .map(str::to_string)
        .ok_or_else(|| DomainError::PathNotInSyncRoot(format!("{full} is not within {root}")))
}

/// Parent directory of a remote path, if any.
pub fn remote_parent(remote_path: &str) -> Option<String> {
    let cleaned = clean_remote(remote_path);
    if cleaned == "/" || cleaned == "." {
        return None;
    }

    match cleaned.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(cleaned[..idx].to_string()),
        None => None,
    }
}

/// Lexical cleanup of a `/`-separated remote path.
fn clean_remote(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let body = segments.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}
