//! Init command - Create a project file in the current directory
//!
//! Provides the `ibridge init` CLI command which writes `.ibridge.yaml`
//! binding the working directory (or `--local`) to a remote path through a
//! profile. With `--host` and `--user` the profile is written into the same
//! file, otherwise it is expected in the global configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use ibridge_core::config::{Config, Profile, Project};
use ibridge_core::domain::SyncMode;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

const DEFAULT_IGNORE: &[&str] = &[".git", "node_modules", ".ibridge.yaml", "*.log", ".DS_Store"];

/// Init command with clap options
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Project name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// SSH profile the project uses
    #[arg(long)]
    pub profile: String,

    /// Absolute directory on the remote host
    #[arg(long)]
    pub remote: String,

    /// Local directory, relative to the project file
    #[arg(long, default_value = ".")]
    pub local: String,

    /// Default direction for `ibridge sync`
    #[arg(long, default_value = "upload")]
    pub mode: SyncMode,

    /// Also write the profile: remote host
    #[arg(long, requires = "user")]
    pub host: Option<String>,

    /// Also write the profile: login user
    #[arg(long, requires = "host")]
    pub user: Option<String>,

    /// Also write the profile: SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Also write the profile: identity file (agent auth when omitted)
    #[arg(long, requires = "host")]
    pub key: Option<PathBuf>,

    /// Replace an existing project file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());

        if ctx.project_file_exists() && !self.force {
            anyhow::bail!(
                "{} already exists, use --force to replace it",
                ctx.project_file.display()
            );
        }

        let config = self.build(ctx)?;
        config.save(&ctx.project_file)?;

        info!(
            path = %ctx.project_file.display(),
            project = %config.projects[0].name,
            "Project file written"
        );

        // the profile may live in the global file
        let warnings: Vec<String> = ctx
            .load_config()
            .map(|layered| layered.validate().iter().map(|e| e.to_string()).collect())
            .unwrap_or_else(|e| vec![format!("{e:#}")]);

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "path": ctx.project_file.display().to_string(),
                "project": config.projects[0].name,
                "warnings": warnings,
            }));
        } else {
            formatter.success(&format!("Created {}", ctx.project_file.display()));
            for warning in &warnings {
                formatter.warn(warning);
            }
            formatter.info("Run 'ibridge status' to check the connection");
        }
        Ok(())
    }

    fn build(&self, ctx: &CliContext) -> Result<Config> {
        if !self.remote.starts_with('/') {
            anyhow::bail!("--remote must be an absolute path: {}", self.remote);
        }

        let name = match &self.name {
            Some(name) => name.clone(),
            None => ctx
                .project_dir()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("Cannot derive a project name, pass --name")?,
        };

        let mut config = Config::default();
        config.projects.push(Project {
            name,
            profile: self.profile.clone(),
            local_path: self.local.clone(),
            remote_path: self.remote.clone(),
            mode: self.mode,
            watch: true,
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
        });

        if let (Some(host), Some(user)) = (&self.host, &self.user) {
            config.profiles.push(Profile {
                name: self.profile.clone(),
                host: host.clone(),
                port: self.port,
                user: user.clone(),
                auth_type: if self.key.is_some() { "key" } else { "agent" }.to_string(),
                key_path: self.key.clone(),
            });
        }
        Ok(config)
    }
}
