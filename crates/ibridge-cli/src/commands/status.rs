//! Status command - Display configuration and connection status
//!
//! Provides the `ibridge status` CLI command which:
//! 1. Shows which configuration files were found
//! 2. Lists configured projects and the selected one
//! 3. Checks the SSH connection for the selected profile
//! 4. Checks that the project's remote directory exists

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::context::{CliContext, ResolvedProject};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Status command with clap options
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only inspect configuration, do not contact the remote host
    #[arg(long)]
    pub offline: bool,
}

/// Result of probing the remote host
#[derive(Debug, Clone, PartialEq)]
enum Connection {
    NotChecked,
    Connected { remote_path_exists: Option<bool> },
    Failed(String),
}

/// Everything `status` reports
#[derive(Debug)]
struct StatusReport {
    config_path: String,
    config_exists: bool,
    project_file: String,
    project_file_exists: bool,
    config_error: Option<String>,
    validation_errors: Vec<String>,
    projects: Vec<String>,
    selected: Option<ResolvedProject>,
    selection_error: Option<String>,
    connection: Connection,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());
        let report = self.collect(ctx).await;

        info!(
            projects = report.projects.len(),
            connection = ?report.connection,
            "Status collected"
        );

        if format.is_json() {
            formatter.print_json(&report.to_json());
        } else {
            report.print_human(formatter.as_ref());
        }
        Ok(())
    }

    async fn collect(&self, ctx: &CliContext) -> StatusReport {
        let mut report = StatusReport {
            config_path: ctx.config_path.display().to_string(),
            config_exists: ctx.config_exists(),
            project_file: ctx.project_file.display().to_string(),
            project_file_exists: ctx.project_file_exists(),
            config_error: None,
            validation_errors: Vec::new(),
            projects: Vec::new(),
            selected: None,
            selection_error: None,
            connection: Connection::NotChecked,
        };

        let config = match ctx.load_config() {
            Ok(config) => config,
            Err(e) => {
                report.config_error = Some(format!("{e:#}"));
                return report;
            }
        };
        report.validation_errors = config.validate().iter().map(|e| e.to_string()).collect();
        report.projects = config.projects.iter().map(|p| p.name.clone()).collect();

        match ctx.resolve(&config) {
            Ok(resolved) => {
                if !self.offline {
                    report.connection = check_remote(ctx, &resolved).await;
                }
                report.selected = Some(resolved);
            }
            Err(e) => report.selection_error = Some(format!("{e:#}")),
        }
        report
    }
}

async fn check_remote(ctx: &CliContext, resolved: &ResolvedProject) -> Connection {
    let remote = match ctx.remote_for(&resolved.profile) {
        Ok(remote) => remote,
        Err(e) => return Connection::Failed(format!("{e:#}")),
    };

    let connection = match remote.check_connection().await {
        Ok(()) => Connection::Connected {
            remote_path_exists: remote.exists(&resolved.target.remote_root).await.ok(),
        },
        Err(e) => Connection::Failed(e.to_string()),
    };
    remote.close().await;
    connection
}

impl StatusReport {
    fn to_json(&self) -> serde_json::Value {
        let project = self.selected.as_ref().map(|r| {
            serde_json::json!({
                "name": r.project.name,
                "profile": r.profile.name,
                "destination": format!("{}@{}:{}", r.profile.user, r.profile.host, r.profile.port),
                "local_root": r.target.local_root.display().to_string(),
                "remote_root": r.target.remote_root,
                "mode": r.target.mode.to_string(),
                "watch": r.target.watch,
                "ignore": r.target.ignore,
            })
        });

        let connection = match &self.connection {
            Connection::NotChecked => serde_json::json!({ "checked": false }),
            Connection::Connected { remote_path_exists } => serde_json::json!({
                "checked": true,
                "connected": true,
                "remote_path_exists": remote_path_exists,
            }),
            Connection::Failed(error) => serde_json::json!({
                "checked": true,
                "connected": false,
                "error": error,
            }),
        };

        serde_json::json!({
            "config": {
                "global": self.config_path,
                "global_exists": self.config_exists,
                "project_file": self.project_file,
                "project_file_exists": self.project_file_exists,
                "error": self.config_error,
                "validation_errors": self.validation_errors,
            },
            "projects": self.projects,
            "project": project,
            "project_error": self.selection_error,
            "connection": connection,
        })
    }

    fn print_human(&self, formatter: &dyn OutputFormatter) {
        formatter.success("island-bridge status");
        formatter.info(&format!(
            "Global config:  {} ({})",
            self.config_path,
            found(self.config_exists)
        ));
        formatter.info(&format!(
            "Project file:   {} ({})",
            self.project_file,
            found(self.project_file_exists)
        ));

        if let Some(error) = &self.config_error {
            formatter.error(error);
            return;
        }
        if !self.validation_errors.is_empty() {
            formatter.warn(&format!(
                "{} configuration problem(s), run 'ibridge config validate'",
                self.validation_errors.len()
            ));
        }

        formatter.info(&format!("Projects:       {}", self.projects.join(", ")));

        let Some(resolved) = &self.selected else {
            if let Some(error) = &self.selection_error {
                formatter.error(error);
            }
            return;
        };

        formatter.info("");
        formatter.info(&format!("Project:        {}", resolved.project.name));
        formatter.info(&format!(
            "Profile:        {} ({}@{}:{})",
            resolved.profile.name, resolved.profile.user, resolved.profile.host, resolved.profile.port
        ));
        formatter.info(&format!(
            "Local:          {}",
            resolved.target.local_root.display()
        ));
        formatter.info(&format!("Remote:         {}", resolved.target.remote_root));
        formatter.info(&format!("Mode:           {}", resolved.target.mode));
        if !resolved.target.ignore.is_empty() {
            formatter.info(&format!("Ignore:         {}", resolved.target.ignore.join(", ")));
        }

        match &self.connection {
            Connection::NotChecked => formatter.info("Connection:     not checked"),
            Connection::Connected { remote_path_exists } => {
                formatter.info("Connection:     ok");
                match remote_path_exists {
                    Some(true) => formatter.info("Remote path:    exists"),
                    Some(false) => formatter.warn(&format!(
                        "Remote path {} does not exist yet",
                        resolved.target.remote_root
                    )),
                    None => formatter.warn("Could not check the remote path"),
                }
            }
            Connection::Failed(error) => formatter.error(&format!("Connection failed: {error}")),
        }
    }
}

fn found(exists: bool) -> &'static str {
    if exists {
        "found"
    } else {
        "not found"
    }
}
