//! Watch command - Push local changes to the remote as they settle
//!
//! Provides the `ibridge watch` CLI command which:
//! 1. Connects to the project's SSH profile
//! 2. Runs an initial upload pass (unless `--no-initial-sync`)
//! 3. Watches the local tree and uploads or deletes changed files
//! 4. Stops on Ctrl+C or SIGTERM

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ibridge_sync::{ChangeHandler, ChangeWatcher};

use crate::commands::sync::build_engine;
use crate::context::CliContext;
use crate::output::{get_formatter, plural, print_summary, OutputFormat};

/// Watch command with clap options
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Skip the upload pass that normally runs before watching
    #[arg(long)]
    pub no_initial_sync: bool,

    /// Override the debounce window in milliseconds
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());

        let config = ctx.load_config()?;
        let resolved = ctx.resolve(&config)?;
        let debounce = Duration::from_millis(self.debounce_ms.unwrap_or(config.sync.debounce_ms));

        let remote = ctx.connect(&resolved.profile).await?;
        let engine = Arc::new(build_engine(ctx, &config, &resolved, remote.clone(), format));

        if !self.no_initial_sync {
            match engine.upload_all().await {
                Ok(summary) => {
                    print_summary(formatter.as_ref(), format, &summary);
                    if summary.errors > 0 {
                        formatter.warn(&format!(
                            "{} file{} failed during the initial upload",
                            summary.errors,
                            plural(summary.errors)
                        ));
                    }
                }
                Err(e) => {
                    remote.close().await;
                    return Err(e.context("Initial upload failed"));
                }
            }
        }

        let watcher = match ChangeWatcher::new(engine.target(), engine.ignore_matcher(), debounce)
            .context("Failed to start watching")
        {
            Ok(watcher) => watcher,
            Err(e) => {
                remote.close().await;
                return Err(e);
            }
        };

        if !ctx.quiet {
            formatter.success(&format!(
                "Watching {} ({} director{}), press Ctrl+C to stop",
                resolved.target.local_root.display(),
                watcher.watched_dirs(),
                if watcher.watched_dirs() == 1 { "y" } else { "ies" }
            ));
        }

        let shutdown = CancellationToken::new();
        let signal_task = tokio::spawn(shutdown_signal(shutdown.clone()));

        let handler: Arc<dyn ChangeHandler> = engine;
        let session = watcher.run(handler, shutdown).await;
        signal_task.abort();

        remote.close().await;
        info!(project = %resolved.project.name, "Watch stopped");
        if format.is_json() {
            print_summary(formatter.as_ref(), format, &session);
        } else if !ctx.quiet {
            formatter.success(&format!(
                "Stopped watching: {} uploaded, {} deleted, {} failed",
                session.transferred, session.deleted, session.errors
            ));
        }
        Ok(())
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}
