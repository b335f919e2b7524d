//! island-bridge SSH - Remote storage over the system `ssh` client
//!
//! Provides:
//! - [`SshRemoteStorage`], the `IRemoteStorage` adapter used by the CLI
//! - Connection options derived from a configuration profile
//! - Parsing of remote `find -printf` listings
//! - Running git inside a project's remote directory
//!
//! ## Modules
//!
//! - [`options`] - Connection options and ssh argument building
//! - [`listing`] - Remote directory listing format and parser
//! - [`storage`] - The `IRemoteStorage` implementation
//! - [`git`] - Validated git command lines run through `exec`

pub mod git;
pub mod listing;
pub mod options;
pub mod storage;

use thiserror::Error;

pub use git::{run_git, GitOperation};
pub use options::{shell_quote, SshOptions};
pub use storage::SshRemoteStorage;

/// Errors that can occur when talking to the remote host
#[derive(Debug, Error)]
pub enum SshError {
    /// The local ssh process could not be started or driven
    #[error("Failed to run ssh: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// ssh itself failed (exit status 255): unreachable host, auth, host key
    #[error("Connection to {destination} failed: {message}")]
    ConnectionFailed {
        destination: String,
        message: String,
    },

    /// The remote command ran and exited non-zero
    #[error("Remote command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// A listing line could not be parsed
    #[error("Invalid remote listing: {0}")]
    InvalidListing(String),

    /// The profile asks for an authentication method this adapter lacks
    #[error("Unsupported auth type: {0}")]
    UnsupportedAuth(String),

    /// A git argument or remote root that cannot be passed through safely
    #[error("Invalid git argument: {0}")]
    InvalidGitArgument(String),

    /// Key authentication without a key path
    #[error("Profile {0} uses key authentication but has no key_path")]
    MissingKey(String),
}
