//! Per-invocation state shared by all commands
//!
//! Global flags are read once into a [`CliContext`] and handed down
//! explicitly; nothing below the command layer reads process-wide state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use ibridge_core::config::{Config, Profile, Project};
use ibridge_core::domain::SyncTarget;
use ibridge_ssh::{SshOptions, SshRemoteStorage};

use crate::Cli;

/// Everything a command needs to locate its configuration and remote
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Global configuration file
    pub config_path: PathBuf,
    /// Project file in the working directory
    pub project_file: PathBuf,
    /// Project selected with `--project`
    pub project: Option<String>,
    pub insecure: bool,
    pub quiet: bool,
    pub cwd: PathBuf,
}

/// A project resolved against the configuration
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    pub project: Project,
    pub profile: Profile,
    pub target: SyncTarget,
}

impl CliContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        Ok(Self::new(cli.config.clone(), cli.project.clone(), cli.insecure, cli.quiet, cwd))
    }

    pub fn new(
        config_path: Option<PathBuf>,
        project: Option<String>,
        insecure: bool,
        quiet: bool,
        cwd: PathBuf,
    ) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(Config::default_path),
            project_file: Config::project_path(&cwd),
            project,
            insecure,
            quiet,
            cwd,
        }
    }

    /// Global file overlaid with the project file
    pub fn load_config(&self) -> Result<Config> {
        Config::load_layered(&self.config_path, &self.project_file)
    }

    /// Pick the project named by `--project` (or the first) with its profile
    ///
    /// # Errors
    /// Fails when the configuration does not validate, so a pass never
    /// starts from settings `config validate` would reject.
    pub fn resolve(&self, config: &Config) -> Result<ResolvedProject> {
        let errors = config.validate();
        if !errors.is_empty() {
            let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::bail!(
                "Invalid configuration ({}), run 'ibridge config validate'",
                details.join("; ")
            );
        }

        let project = config.get_project(self.project.as_deref())?.clone();
        let profile = config
            .get_profile(&project.profile)
            .with_context(|| format!("Project {} refers to a missing profile", project.name))?
            .clone();
        let target = SyncTarget::from_project(&project, &self.cwd);

        debug!(
            project = %project.name,
            profile = %profile.name,
            local = %target.local_root.display(),
            remote = %target.remote_root,
            "Resolved project"
        );

        Ok(ResolvedProject {
            project,
            profile,
            target,
        })
    }

    /// SSH adapter for `profile`, honouring `--insecure`
    pub fn remote_for(&self, profile: &Profile) -> Result<Arc<SshRemoteStorage>> {
        let options = SshOptions::from_profile(profile, self.insecure)
            .with_context(|| format!("Invalid profile {}", profile.name))?;
        Ok(Arc::new(SshRemoteStorage::new(options)))
    }

    /// Connect and verify the connection before any pass starts
    pub async fn connect(&self, profile: &Profile) -> Result<Arc<SshRemoteStorage>> {
        let remote = self.remote_for(profile)?;
        remote
            .check_connection()
            .await
            .with_context(|| format!("Failed to connect to {}@{}", profile.user, profile.host))?;
        Ok(remote)
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }

    pub fn project_file_exists(&self) -> bool {
        self.project_file.exists()
    }

    pub fn project_dir(&self) -> &Path {
        &self.cwd
    }
}
