//! Sync command - Run one pass between the local and remote trees
//!
//! Provides the `ibridge sync` CLI command which:
//! 1. Loads the layered configuration and resolves the project
//! 2. Connects to the project's SSH profile
//! 3. Runs the SyncEngine in the requested direction
//! 4. Prints the pass summary

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use ibridge_core::config::Config;
use ibridge_core::domain::SyncMode;
use ibridge_core::ports::IRemoteStorage;
use ibridge_sync::SyncEngine;

use crate::context::{CliContext, ResolvedProject};
use crate::output::{get_formatter, plural, print_summary, OutputFormat};
use crate::progress::ConsoleProgress;

/// Sync command with clap options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Direction: upload (up, push), download (down, pull) or both
    /// (bidirectional, two-way). Defaults to the project's mode.
    #[arg(short, long)]
    pub direction: Option<SyncMode>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());

        let config = ctx.load_config()?;
        let resolved = ctx.resolve(&config)?;
        let mode = self.direction.unwrap_or(resolved.target.mode);

        info!(project = %resolved.project.name, %mode, "Starting sync");
        if !ctx.quiet {
            formatter.info(&format!(
                "{}: {} <-> {}@{}:{} ({})",
                resolved.project.name,
                resolved.target.local_root.display(),
                resolved.profile.user,
                resolved.profile.host,
                resolved.target.remote_root,
                mode
            ));
        }

        let remote = ctx.connect(&resolved.profile).await?;
        let engine = build_engine(ctx, &config, &resolved, remote.clone(), format);

        let result = engine.run(mode).await;
        remote.close().await;
        let summary = result?;

        print_summary(formatter.as_ref(), format, &summary);

        if summary.errors > 0 {
            anyhow::bail!("{} file{} failed to sync", summary.errors, plural(summary.errors));
        }
        Ok(())
    }
}

/// SyncEngine for a resolved project, with console progress when wanted
pub(crate) fn build_engine(
    ctx: &CliContext,
    config: &Config,
    resolved: &ResolvedProject,
    remote: Arc<dyn IRemoteStorage>,
    format: OutputFormat,
) -> SyncEngine {
    let engine = SyncEngine::new(remote, Arc::new(resolved.target.clone()), &config.sync);

    if ctx.quiet || format.is_json() || !config.sync.show_progress {
        return engine;
    }
    engine.with_observer(Arc::new(
        ConsoleProgress::new(&resolved.target.local_root).with_skipped(false),
    ))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::{Cli, Commands};

    use super::*;

    fn direction(args: &[&str]) -> Option<SyncMode> {
        let mut argv = vec!["ibridge", "sync"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Sync(cmd) => cmd.direction,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_direction_aliases() {
        assert_eq!(direction(&[]), None);
        assert_eq!(direction(&["-d", "push"]), Some(SyncMode::Upload));
        assert_eq!(direction(&["--direction", "pull"]), Some(SyncMode::Download));
        assert_eq!(
            direction(&["--direction", "two-way"]),
            Some(SyncMode::Bidirectional)
        );
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        assert!(Cli::try_parse_from(["ibridge", "sync", "--direction", "sideways"]).is_err());
    }
}
