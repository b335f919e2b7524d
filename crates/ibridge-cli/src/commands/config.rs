//! Config command - View and manage island-bridge configuration
//!
//! Provides the `ibridge config` CLI command which:
//! 1. Lists configured profiles and projects
//! 2. Shows the effective (global + project file) configuration
//! 3. Sets `sync.*` and `logging.*` values in the global file
//! 4. Validates the effective configuration and reports errors

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use ibridge_core::config::Config;

use crate::context::CliContext;
use crate::output::{get_formatter, plural, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// List profiles and projects
    List,
    /// Display the effective configuration
    Show,
    /// Set a value in the global configuration file
    Set {
        /// Configuration key (e.g., "sync.max_concurrency")
        key: String,
        /// New value
        value: String,
    },
    /// Validate the effective configuration
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::List => self.execute_list(ctx, format),
            ConfigCommand::Show => self.execute_show(ctx, format),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value, format),
            ConfigCommand::Validate => self.execute_validate(ctx, format),
        }
    }

    fn execute_list(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());
        let config = ctx.load_config()?;

        if format.is_json() {
            let profiles: Vec<_> = config
                .profiles
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "host": p.host,
                        "port": p.port,
                        "user": p.user,
                        "auth_type": p.auth_type,
                    })
                })
                .collect();
            let projects: Vec<_> = config
                .projects
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "profile": p.profile,
                        "local_path": p.local_path,
                        "remote_path": p.remote_path,
                        "mode": p.mode.to_string(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "profiles": profiles,
                "projects": projects,
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "{} profile{}",
            config.profiles.len(),
            plural(config.profiles.len() as u64)
        ));
        for p in &config.profiles {
            formatter.info(&format!(
                "{:<16} {}@{}:{} ({})",
                p.name, p.user, p.host, p.port, p.auth_type
            ));
        }

        formatter.success(&format!(
            "{} project{}",
            config.projects.len(),
            plural(config.projects.len() as u64)
        ));
        for p in &config.projects {
            let local = if p.local_path.is_empty() {
                "."
            } else {
                p.local_path.as_str()
            };
            formatter.info(&format!(
                "{:<16} {} -> {}:{} ({})",
                p.name, local, p.profile, p.remote_path, p.mode
            ));
        }
        Ok(())
    }

    fn execute_show(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());

        let config = if ctx.config_exists() || ctx.project_file_exists() {
            ctx.load_config()?
        } else {
            formatter.warn("No configuration file found, showing defaults");
            Config::default()
        };

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            if ctx.project_file_exists() {
                formatter.info(&format!("Overlaid with {}", ctx.project_file.display()));
            }
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CliContext, key: &str, value: &str, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());

        let mut config = if ctx.config_exists() {
            Config::load(&ctx.config_path)?
        } else {
            Config::default()
        };

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {:<28} - {}", name, help));
                }
            }
            anyhow::bail!("Configuration not changed");
        }

        // only errors in the edited section block the write
        let section = key.split('.').next().unwrap_or(key);
        let errors: Vec<String> = config
            .validate()
            .into_iter()
            .filter(|e| e.field.starts_with(section))
            .map(|e| e.to_string())
            .collect();

        if !errors.is_empty() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
            }
            anyhow::bail!("Configuration not changed");
        }

        config.save(&ctx.config_path)?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format.is_json());

        let config = match ctx.load_config() {
            Ok(config) => config,
            Err(e) => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": ctx.config_path.display().to_string(),
                        "errors": [format!("{e:#}")],
                    }));
                } else {
                    formatter.error(&format!("{e:#}"));
                    formatter.info(&format!("File: {}", ctx.config_path.display()));
                }
                anyhow::bail!("Configuration could not be loaded");
            }
        };

        info!(config_path = %ctx.config_path.display(), "Validating configuration");

        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": ctx.config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", ctx.config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                plural(errors.len() as u64)
            ));
            formatter.info(&format!("File: {}", ctx.config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration is invalid");
        }
        Ok(())
    }
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.max_concurrency", "Parallel transfers per pass"),
    ("sync.enable_retry", "true|false"),
    ("sync.debounce_ms", "Watch debounce window"),
    ("sync.cache_max_age_secs", "Change cache entry lifetime"),
    ("sync.show_progress", "true|false"),
    ("sync.retry.max_attempts", "Attempts per transfer"),
    ("sync.retry.initial_delay_ms", "First retry delay"),
    ("sync.retry.max_delay_ms", "Retry delay cap"),
    ("sync.retry.backoff_factor", "Delay multiplier"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.format", "text|json"),
];

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        value
            .parse::<T>()
            .with_context(|| format!("Expected a number for {key}"))
    }

    fn boolean(key: &str, value: &str) -> Result<bool> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => anyhow::bail!("Expected true or false for {key}"),
        }
    }

    match key {
        // --- sync ---
        "sync.max_concurrency" => config.sync.max_concurrency = number(key, value)?,
        "sync.enable_retry" => config.sync.enable_retry = boolean(key, value)?,
        "sync.debounce_ms" => config.sync.debounce_ms = number(key, value)?,
        "sync.cache_max_age_secs" => config.sync.cache_max_age_secs = number(key, value)?,
        "sync.show_progress" => config.sync.show_progress = boolean(key, value)?,
        "sync.retry.max_attempts" => config.sync.retry.max_attempts = number(key, value)?,
        "sync.retry.initial_delay_ms" => config.sync.retry.initial_delay_ms = number(key, value)?,
        "sync.retry.max_delay_ms" => config.sync.retry.max_delay_ms = number(key, value)?,
        "sync.retry.backoff_factor" => config.sync.retry.backoff_factor = number(key, value)?,

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
