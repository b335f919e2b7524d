//! Git pass-through - Run git inside a project's remote directory
//!
//! Builds `cd <root> && git <args>` command lines and runs them through
//! [`IRemoteStorage::exec`], so any remote storage that can execute shell
//! commands can drive a repository living in the project's remote root.
//!
//! ## Design Notes
//!
//! - Every word is single-quoted with [`shell_quote`].
//! - The remote root and file arguments are also limited to a small
//!   character set; anything else is rejected before contacting the host.
//! - Commit messages are free text and only quoted.
//! - File lists follow `--` so a name cannot be taken as a git option.

use ibridge_core::ports::IRemoteStorage;
use tracing::debug;

use crate::options::shell_quote;
use crate::SshError;

// ============================================================================
// Operations
// ============================================================================

/// A git invocation supported by the pass-through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOperation {
    Status,
    /// Diff of the working tree, optionally limited to some files
    Diff { files: Vec<String> },
    /// Stage files; an empty list stages everything
    Add { files: Vec<String> },
    Commit { message: String },
    Push,
    Pull,
    /// The last `count` commits, one per line
    Log { count: u32 },
    /// Name of the checked-out branch
    Branch,
}

impl GitOperation {
    /// Short name used in logs and JSON output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Diff { .. } => "diff",
            Self::Add { .. } => "add",
            Self::Commit { .. } => "commit",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Log { .. } => "log",
            Self::Branch => "branch",
        }
    }

    /// Arguments passed to `git`, after validation
    pub fn args(&self) -> Result<Vec<String>, SshError> {
        let args = match self {
            Self::Status => vec!["status".to_string()],
            Self::Diff { files } => with_files("diff", files)?,
            Self::Add { files } if files.is_empty() => {
                vec!["add".to_string(), "--".to_string(), ".".to_string()]
            }
            Self::Add { files } => with_files("add", files)?,
            Self::Commit { message } => {
                if message.trim().is_empty() {
                    return Err(SshError::InvalidGitArgument(
                        "commit message must not be empty".to_string(),
                    ));
                }
                vec!["commit".to_string(), "-m".to_string(), message.clone()]
            }
            Self::Push => vec!["push".to_string()],
            Self::Pull => vec!["pull".to_string()],
            Self::Log { count } => vec![
                "log".to_string(),
                format!("-n{}", (*count).max(1)),
                "--oneline".to_string(),
            ],
            Self::Branch => vec!["branch".to_string(), "--show-current".to_string()],
        };
        Ok(args)
    }
}

fn with_files(subcommand: &str, files: &[String]) -> Result<Vec<String>, SshError> {
    let mut args = vec![subcommand.to_string()];
    if !files.is_empty() {
        args.push("--".to_string());
        for file in files {
            if !is_safe_argument(file) {
                return Err(SshError::InvalidGitArgument(format!(
                    "file argument {file:?} contains unsafe characters"
                )));
            }
            args.push(file.clone());
        }
    }
    Ok(args)
}

// ============================================================================
// Command building
// ============================================================================

/// Characters allowed in the remote root
fn is_safe_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '~'))
}

/// Characters allowed in file arguments
fn is_safe_argument(arg: &str) -> bool {
    !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':' | '@' | '='))
}

/// Shell command running `git <args>` inside `remote_root`
pub fn git_command(remote_root: &str, args: &[String]) -> Result<String, SshError> {
    if !is_safe_path(remote_root) {
        return Err(SshError::InvalidGitArgument(format!(
            "remote path {remote_root:?} contains unsafe characters"
        )));
    }

    let quoted: Vec<String> = args.iter().map(|arg| shell_quote(arg)).collect();
    Ok(format!(
        "cd {} && git {}",
        shell_quote(remote_root),
        quoted.join(" ")
    ))
}

/// Runs `operation` in `remote_root` and returns git's standard output
#[tracing::instrument(skip(remote, operation), fields(op = operation.name()))]
pub async fn run_git(
    remote: &dyn IRemoteStorage,
    remote_root: &str,
    operation: &GitOperation,
) -> anyhow::Result<String> {
    let command = git_command(remote_root, &operation.args()?)?;
    debug!(%command, "Running remote git");
    remote.exec(&command).await
}
