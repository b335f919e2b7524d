//! Configuration module for island-bridge.
//!
//! Provides typed configuration structs that map to the YAML (or JSON)
//! configuration files, with layered loading, validation, defaults, and a
//! builder pattern for programmatic use.
//!
//! Two files are consulted: a global file holding shared SSH profiles, and
//! an optional per-project file in the working directory. Profiles and
//! projects are merged by name, the project file winning.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, SyncMode};

/// File name of the per-project configuration, looked up in the working directory.
pub const PROJECT_FILE_NAME: &str = ".ibridge.yaml";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for island-bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub profiles: Vec<Profile>,
    pub projects: Vec<Project>,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// SSH connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub user: String,
    /// `key` (explicit identity file) or `agent` (ssh-agent / default identities).
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    /// Identity file used when `auth_type` is `key`.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

/// A local directory bound to a remote directory through a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub profile: String,
    /// Local directory, relative paths resolve against the working directory.
    #[serde(default)]
    pub local_path: String,
    pub remote_path: String,
    #[serde(default)]
    pub mode: SyncMode,
    #[serde(default)]
    pub watch: bool,
    /// Glob patterns excluded from every pass and from watching.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Synchronization engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of concurrent file transfers per pass.
    pub max_concurrency: usize,
    /// Wrap each transfer in the retry policy.
    pub enable_retry: bool,
    pub retry: RetryConfig,
    /// Quiet period after the last filesystem event before it is dispatched.
    pub debounce_ms: u64,
    /// Age after which a change-cache record no longer counts as seen.
    pub cache_max_age_secs: u64,
    /// Print per-file progress lines.
    pub show_progress: bool,
}

/// Bounded exponential backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_auth_type() -> String {
    "key".to_string()
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            profiles: Vec::new(),
            projects: Vec::new(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            enable_retry: true,
            retry: RetryConfig::default(),
            debounce_ms: 300,
            cache_max_age_secs: 24 * 60 * 60,
            show_progress: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from `path`.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?
        };
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Load the global file and overlay the project file on top of it.
    ///
    /// Either file may be missing, but not both.
    pub fn load_layered(global: &Path, project: &Path) -> anyhow::Result<Self> {
        let base = if global.exists() {
            Some(Self::load(global)?)
        } else {
            None
        };
        let overlay = if project.exists() {
            Some(Self::load(project)?)
        } else {
            None
        };

        match (base, overlay) {
            (Some(base), Some(overlay)) => Ok(base.merge(overlay)),
            (Some(config), None) | (None, Some(config)) => Ok(config),
            (None, None) => anyhow::bail!(
                "no configuration found (looked in {} and {})",
                global.display(),
                project.display()
            ),
        }
    }

    /// Merge `overlay` into `self`.
    ///
    /// Profiles and projects with the same name are replaced by the overlay's
    /// version; new ones are appended. The `sync` and `logging` sections keep
    /// the base values.
    pub fn merge(mut self, overlay: Config) -> Self {
        for profile in overlay.profiles {
            match self.profiles.iter_mut().find(|p| p.name == profile.name) {
                Some(existing) => *existing = profile,
                None => self.profiles.push(profile),
            }
        }
        for project in overlay.projects {
            match self.projects.iter_mut().find(|p| p.name == project.name) {
                Some(existing) => *existing = project,
                None => self.projects.push(project),
            }
        }
        self
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Platform-appropriate default path for the global configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/ibridge/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ibridge")
            .join("config.yaml")
    }

    /// Path of the per-project configuration file under `dir`.
    pub fn project_path(dir: &Path) -> PathBuf {
        dir.join(PROJECT_FILE_NAME)
    }

    /// Look up a profile by name.
    pub fn get_profile(&self, name: &str) -> Result<&Profile, DomainError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| DomainError::ProfileNotFound(name.to_string()))
    }

    /// Look up a project by name, or the first project when `name` is `None`.
    pub fn get_project(&self, name: Option<&str>) -> Result<&Project, DomainError> {
        match name {
            Some(name) => self
                .projects
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| DomainError::ProjectNotFound(name.to_string())),
            None => self
                .projects
                .first()
                .ok_or_else(|| DomainError::ProjectNotFound("<none configured>".to_string())),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_concurrency"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Valid values for `profiles[].auth_type`.
const VALID_AUTH_TYPES: &[&str] = &["key", "agent"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: String| {
            errors.push(ValidationError { field, message });
        };

        // --- profiles ---
        for (i, profile) in self.profiles.iter().enumerate() {
            let at = |f: &str| format!("profiles[{i}].{f}");
            if profile.name.trim().is_empty() {
                push(at("name"), "must not be empty".into());
            }
            if profile.host.trim().is_empty() {
                push(at("host"), "must not be empty".into());
            }
            if profile.user.trim().is_empty() {
                push(at("user"), "must not be empty".into());
            }
            if profile.port == 0 {
                push(at("port"), "must be greater than 0".into());
            }
            if !VALID_AUTH_TYPES.contains(&profile.auth_type.as_str()) {
                push(
                    at("auth_type"),
                    format!(
                        "invalid auth type '{}'; valid options: {}",
                        profile.auth_type,
                        VALID_AUTH_TYPES.join(", ")
                    ),
                );
            }
            if profile.auth_type == "key" && profile.key_path.is_none() {
                push(at("key_path"), "required when auth_type is 'key'".into());
            }
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                push(at("name"), format!("duplicate profile '{}'", profile.name));
            }
        }

        // --- projects ---
        for (i, project) in self.projects.iter().enumerate() {
            let at = |f: &str| format!("projects[{i}].{f}");
            if project.name.trim().is_empty() {
                push(at("name"), "must not be empty".into());
            }
            if !self.profiles.iter().any(|p| p.name == project.profile) {
                push(
                    at("profile"),
                    format!("unknown profile '{}'", project.profile),
                );
            }
            if !project.remote_path.starts_with('/') {
                push(
                    at("remote_path"),
                    format!("must be absolute: '{}'", project.remote_path),
                );
            }
            if self.projects[..i].iter().any(|p| p.name == project.name) {
                push(at("name"), format!("duplicate project '{}'", project.name));
            }
        }

        // --- sync ---
        if self.sync.max_concurrency == 0 {
            push("sync.max_concurrency".into(), "must be greater than 0".into());
        }
        if self.sync.debounce_ms == 0 {
            push("sync.debounce_ms".into(), "must be greater than 0".into());
        }
        if self.sync.retry.max_attempts == 0 {
            push(
                "sync.retry.max_attempts".into(),
                "must be greater than 0".into(),
            );
        }
        if !self.sync.retry.backoff_factor.is_finite() || self.sync.retry.backoff_factor < 0.0 {
            push(
                "sync.retry.backoff_factor".into(),
                "must be a finite number >= 0".into(),
            );
        }
        if self.sync.retry.max_delay_ms < self.sync.retry.initial_delay_ms {
            push(
                "sync.retry.max_delay_ms".into(),
                format!(
                    "max_delay_ms ({}) must not be below initial_delay_ms ({})",
                    self.sync.retry.max_delay_ms, self.sync.retry.initial_delay_ms
                ),
            );
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level".into(),
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            push(
                "logging.format".into(),
                format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use ibridge_core::config::{ConfigBuilder, Profile};
///
/// let config = ConfigBuilder::new()
///     .profile(Profile {
///         name: "dev".into(),
///         host: "dev.example.com".into(),
///         port: 22,
///         user: "deploy".into(),
///         auth_type: "agent".into(),
///         key_path: None,
///     })
///     .sync_max_concurrency(4)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- profiles / projects ---

    pub fn profile(mut self, profile: Profile) -> Self {
        self.config.profiles.push(profile);
        self
    }

    pub fn project(mut self, project: Project) -> Self {
        self.config.projects.push(project);
        self
    }

    // --- sync ---

    pub fn sync_max_concurrency(mut self, n: usize) -> Self {
        self.config.sync.max_concurrency = n;
        self
    }

    pub fn sync_enable_retry(mut self, enabled: bool) -> Self {
        self.config.sync.enable_retry = enabled;
        self
    }

    pub fn sync_retry(mut self, retry: RetryConfig) -> Self {
        self.config.sync.retry = retry;
        self
    }

    pub fn sync_debounce_ms(mut self, ms: u64) -> Self {
        self.config.sync.debounce_ms = ms;
        self
    }

    pub fn sync_cache_max_age_secs(mut self, secs: u64) -> Self {
        self.config.sync.cache_max_age_secs = secs;
        self
    }

    pub fn sync_show_progress(mut self, show: bool) -> Self {
        self.config.sync.show_progress = show;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn dev_profile() -> Profile {
        Profile {
            name: "dev".into(),
            host: "dev.example.com".into(),
            port: 22,
            user: "deploy".into(),
            auth_type: "key".into(),
            key_path: Some(PathBuf::from("/home/me/.ssh/id_ed25519")),
        }
    }

    fn web_project() -> Project {
        Project {
            name: "web".into(),
            profile: "dev".into(),
            local_path: ".".into(),
            remote_path: "/srv/web".into(),
            mode: SyncMode::Upload,
            watch: false,
            ignore: vec![".git".into()],
        }
    }

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        tmp.write_all(content.as_bytes()).unwrap();
        tmp.flush().unwrap();
        tmp
    }

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.version, 1);
        assert!(cfg.profiles.is_empty());
        assert!(cfg.projects.is_empty());
        assert_eq!(cfg.sync.max_concurrency, 10);
        assert!(cfg.sync.enable_retry);
        assert_eq!(cfg.sync.retry.max_attempts, 3);
        assert_eq!(cfg.sync.retry.initial_delay_ms, 1_000);
        assert_eq!(cfg.sync.retry.max_delay_ms, 30_000);
        assert_eq!(cfg.sync.retry.backoff_factor, 2.0);
        assert_eq!(cfg.sync.debounce_ms, 300);
        assert_eq!(cfg.sync.cache_max_age_secs, 86_400);
        assert!(cfg.sync.show_progress);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "text");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
profiles:
  - name: dev
    host: dev.example.com
    user: deploy
    key_path: /home/me/.ssh/id_ed25519
projects:
  - name: web
    profile: dev
    local_path: ./site
    remote_path: /srv/web
    mode: two-way
    watch: true
    ignore: [".git", "node_modules", "*.log"]
sync:
  max_concurrency: 4
  retry:
    max_attempts: 5
logging:
  level: debug
"#;
        let tmp = write_temp(".yaml", yaml);

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.profiles.len(), 1);
        assert_eq!(cfg.profiles[0].port, 22);
        assert_eq!(cfg.profiles[0].auth_type, "key");
        assert_eq!(cfg.projects[0].mode, SyncMode::Bidirectional);
        assert!(cfg.projects[0].watch);
        assert_eq!(cfg.projects[0].ignore.len(), 3);
        assert_eq!(cfg.sync.max_concurrency, 4);
        assert_eq!(cfg.sync.retry.max_attempts, 5);
        // untouched fields keep their defaults
        assert_eq!(cfg.sync.retry.initial_delay_ms, 1_000);
        assert_eq!(cfg.sync.debounce_ms, 300);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_from_json_file() {
        let json = r#"{
  "version": 1,
  "profiles": [{"name": "dev", "host": "h", "port": 2222, "user": "u", "auth_type": "agent"}],
  "projects": [{"name": "api", "profile": "dev", "remote_path": "/srv/api", "mode": "one-way-remote"}]
}"#;
        let tmp = write_temp(".json", json);

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.profiles[0].port, 2222);
        assert_eq!(cfg.projects[0].mode, SyncMode::Download);
        assert_eq!(cfg.projects[0].local_path, "");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.max_concurrency, 10);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let tmp = write_temp(".yaml", "not: [valid: yaml: {{{");
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn load_layered_merges_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.yaml");
        let project = dir.path().join(PROJECT_FILE_NAME);

        let base = ConfigBuilder::new()
            .profile(dev_profile())
            .project(web_project())
            .build();
        base.save(&global).unwrap();

        let mut changed = web_project();
        changed.remote_path = "/srv/web-v2".into();
        let mut extra = web_project();
        extra.name = "docs".into();
        let overlay = ConfigBuilder::new().project(changed).project(extra).build();
        overlay.save(&project).unwrap();

        let cfg = Config::load_layered(&global, &project).unwrap();
        assert_eq!(cfg.profiles.len(), 1);
        assert_eq!(cfg.projects.len(), 2);
        assert_eq!(cfg.get_project(Some("web")).unwrap().remote_path, "/srv/web-v2");
        assert!(cfg.get_project(Some("docs")).is_ok());
    }

    #[test]
    fn load_layered_accepts_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join(PROJECT_FILE_NAME);
        ConfigBuilder::new()
            .profile(dev_profile())
            .build()
            .save(&project)
            .unwrap();

        let cfg = Config::load_layered(&dir.path().join("missing.yaml"), &project).unwrap();
        assert_eq!(cfg.profiles.len(), 1);
    }

    #[test]
    fn load_layered_fails_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_layered(&dir.path().join("a.yaml"), &dir.path().join("b.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn save_and_reload_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = ConfigBuilder::new()
            .profile(dev_profile())
            .project(web_project())
            .build();
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.profiles, cfg.profiles);
        assert_eq!(loaded.projects, cfg.projects);
    }

    // -- Lookups --

    #[test]
    fn get_project_defaults_to_first() {
        let mut second = web_project();
        second.name = "api".into();
        let cfg = ConfigBuilder::new()
            .project(web_project())
            .project(second)
            .build();

        assert_eq!(cfg.get_project(None).unwrap().name, "web");
        assert_eq!(cfg.get_project(Some("api")).unwrap().name, "api");
        assert_eq!(
            cfg.get_project(Some("nope")),
            Err(DomainError::ProjectNotFound("nope".into()))
        );
        assert!(Config::default().get_project(None).is_err());
    }

    #[test]
    fn get_profile_reports_missing() {
        let cfg = ConfigBuilder::new().profile(dev_profile()).build();
        assert_eq!(cfg.get_profile("dev").unwrap().host, "dev.example.com");
        assert_eq!(
            cfg.get_profile("prod"),
            Err(DomainError::ProfileNotFound("prod".into()))
        );
    }

    // -- Validation --

    #[test]
    fn validate_catches_unknown_profile_and_relative_remote() {
        let mut project = web_project();
        project.profile = "missing".into();
        project.remote_path = "srv/web".into();
        let cfg = ConfigBuilder::new().project(project).build();

        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"projects[0].profile".to_string()));
        assert!(fields.contains(&"projects[0].remote_path".to_string()));
    }

    #[test]
    fn validate_catches_duplicates() {
        let cfg = ConfigBuilder::new()
            .profile(dev_profile())
            .profile(dev_profile())
            .project(web_project())
            .project(web_project())
            .build();

        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"profiles[1].name".to_string()));
        assert!(fields.contains(&"projects[1].name".to_string()));
    }

    #[test]
    fn validate_catches_bad_profile_fields() {
        let mut profile = dev_profile();
        profile.host = String::new();
        profile.port = 0;
        profile.auth_type = "password".into();
        let cfg = ConfigBuilder::new().profile(profile).build();

        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"profiles[0].host".to_string()));
        assert!(fields.contains(&"profiles[0].port".to_string()));
        assert!(fields.contains(&"profiles[0].auth_type".to_string()));
    }

    #[test]
    fn validate_catches_key_auth_without_key() {
        let mut profile = dev_profile();
        profile.key_path = None;
        let cfg = ConfigBuilder::new().profile(profile).build();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "profiles[0].key_path"));
    }

    #[test]
    fn validate_catches_bad_sync_values() {
        let cfg = ConfigBuilder::new()
            .sync_max_concurrency(0)
            .sync_debounce_ms(0)
            .sync_retry(RetryConfig {
                max_attempts: 0,
                initial_delay_ms: 500,
                max_delay_ms: 100,
                backoff_factor: f64::NAN,
            })
            .build();

        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"sync.max_concurrency".to_string()));
        assert!(fields.contains(&"sync.debounce_ms".to_string()));
        assert!(fields.contains(&"sync.retry.max_attempts".to_string()));
        assert!(fields.contains(&"sync.retry.backoff_factor".to_string()));
        assert!(fields.contains(&"sync.retry.max_delay_ms".to_string()));
    }

    #[test]
    fn validate_allows_zero_backoff_factor() {
        let cfg = ConfigBuilder::new()
            .sync_retry(RetryConfig {
                backoff_factor: 0.0,
                ..RetryConfig::default()
            })
            .build();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_catches_invalid_logging() {
        let cfg = ConfigBuilder::new()
            .logging_level("verbose")
            .logging_format("xml")
            .build();
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"logging.level".to_string()));
        assert!(fields.contains(&"logging.format".to_string()));
    }

    #[test]
    fn build_validated_returns_errors() {
        let result = ConfigBuilder::new().sync_max_concurrency(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "sync.max_concurrency: must be greater than 0"
        );
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let path = Config::default_path();
        assert!(path.ends_with("ibridge/config.yaml"));
    }
}
