//! Git command - Run git in the project's remote directory
//!
//! Provides the `ibridge git` CLI command which:
//! 1. Resolves the project and connects to its profile
//! 2. Runs the git subcommand inside the remote root
//! 3. Prints git's output, or a short confirmation when there is none

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;
use tracing::info;

use ibridge_ssh::{run_git, GitOperation};

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

/// Git subcommands run on the remote host
#[derive(Debug, Subcommand)]
pub enum GitCommand {
    /// Show the working tree status
    Status,
    /// Show unstaged changes
    Diff {
        /// Limit the diff to these files
        files: Vec<String>,
    },
    /// Stage files (everything when none are given)
    Add {
        files: Vec<String>,
    },
    /// Record staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Push the current branch
    Push,
    /// Pull into the current branch
    Pull,
    /// Show recent commits
    Log {
        /// Number of commits
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u32,
    },
    /// Show the current branch
    Branch,
}

impl GitCommand {
    fn operation(&self) -> GitOperation {
        match self {
            Self::Status => GitOperation::Status,
            Self::Diff { files } => GitOperation::Diff {
                files: files.clone(),
            },
            Self::Add { files } => GitOperation::Add {
                files: files.clone(),
            },
            Self::Commit { message } => GitOperation::Commit {
                message: message.clone(),
            },
            Self::Push => GitOperation::Push,
            Self::Pull => GitOperation::Pull,
            Self::Log { count } => GitOperation::Log { count: *count },
            Self::Branch => GitOperation::Branch,
        }
    }

    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());
        let operation = self.operation();
        // Reject bad arguments before opening a connection
        operation.args()?;

        let config = ctx.load_config()?;
        let resolved = ctx.resolve(&config)?;
        info!(
            project = %resolved.project.name,
            op = operation.name(),
            "Running remote git"
        );

        let remote = ctx.connect(&resolved.profile).await?;
        let result = run_git(remote.as_ref(), &resolved.target.remote_root, &operation).await;
        remote.close().await;
        let output = result?;

        if format.is_json() {
            formatter.print_json(&json!({
                "project": resolved.project.name,
                "command": operation.name(),
                "output": output,
            }));
        } else if !output.trim().is_empty() {
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
        } else if !ctx.quiet {
            formatter.success(&confirmation(&operation));
        }
        Ok(())
    }
}

/// Message shown when git printed nothing
fn confirmation(operation: &GitOperation) -> String {
    match operation {
        GitOperation::Add { .. } => "Files staged".to_string(),
        GitOperation::Push => "Pushed".to_string(),
        GitOperation::Pull => "Already up to date".to_string(),
        other => format!("git {} finished", other.name()),
    }
}
