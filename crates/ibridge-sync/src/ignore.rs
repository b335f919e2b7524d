//! Ignore rules for sync passes and watch registration
//!
//! A relative path is ignored when any configured pattern matches one of:
//!
//! 1. the basename, as a glob
//! 2. the whole relative path, as a glob
//! 3. any single path segment, as a glob
//! 4. any substring of the path, taken literally
//!
//! Rule 4 matches broadly: `log` ignores `catalog/x`. Callers that walk
//! a tree must prune a directory's whole subtree when the directory itself
//! is ignored.
//!
//! Globs follow shell semantics: `*` and `?` never cross a `/`.

use glob::{MatchOptions, Pattern};
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct IgnoreRule {
    raw: String,
    /// `None` when the pattern is not a valid glob; the substring rule still applies.
    glob: Option<Pattern>,
}

impl IgnoreRule {
    fn matches(&self, rel: &str, basename: &str) -> bool {
        if let Some(glob) = &self.glob {
            if glob.matches_with(basename, MATCH_OPTIONS)
                || glob.matches_with(rel, MATCH_OPTIONS)
                || rel
                    .split('/')
                    .any(|segment| glob.matches_with(segment, MATCH_OPTIONS))
            {
                return true;
            }
        }
        rel.contains(self.raw.as_str())
    }
}

/// Immutable set of ignore patterns
///
/// Pure and stateless apart from the pattern list, so one instance is shared
/// between the engine and the watcher behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    rules: Vec<IgnoreRule>,
}

impl IgnoreMatcher {
    /// Compile `patterns` in order. Blank patterns are dropped, since a blank
    /// substring would match every path. Other patterns are kept verbatim,
    /// surrounding whitespace included.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|p| {
                let raw = p.as_ref();
                if raw.trim().is_empty() {
                    return None;
                }
                let glob = match Pattern::new(raw) {
                    Ok(glob) => Some(glob),
                    Err(e) => {
                        warn!(pattern = raw, error = %e, "Invalid glob, only substring matching applies");
                        None
                    }
                };
                Some(IgnoreRule {
                    raw: raw.to_string(),
                    glob,
                })
            })
            .collect();

        Self { rules }
    }

    /// Whether `relative_path` (with `/` separators) is excluded from sync.
    ///
    /// The root itself (`""` or `"."`) is never ignored.
    pub fn should_ignore(&self, relative_path: &str) -> bool {
        if relative_path.is_empty() || relative_path == "." {
            return false;
        }

        let basename = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.rules
            .iter()
            .any(|rule| rule.matches(relative_path, basename))
    }

    /// The patterns in configuration order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.raw.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
