//! Connection options and ssh command-line construction
//!
//! Every remote operation is one `ssh` invocation. Connection multiplexing
//! (`ControlMaster=auto`) lets concurrent invocations share one
//! authenticated session, each running on its own channel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ibridge_core::config::Profile;

use crate::SshError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONTROL_PERSIST: Duration = Duration::from_secs(60);

/// How to reach one remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Identity file for key authentication; `None` defers to the agent
    pub identity_file: Option<PathBuf>,
    /// Skip host key verification entirely
    pub insecure: bool,
    pub connect_timeout: Duration,
    /// Control socket for multiplexing; `None` disables it
    pub control_path: Option<PathBuf>,
    pub control_persist: Duration,
    /// Client binary to run, `ssh` unless overridden
    pub program: String,
}

impl SshOptions {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            identity_file: None,
            insecure: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            control_path: Some(std::env::temp_dir().join("ibridge-%C")),
            control_persist: DEFAULT_CONTROL_PERSIST,
            program: "ssh".to_string(),
        }
    }

    /// Options for `profile`
    ///
    /// # Errors
    /// Fails for an unknown `auth_type` or a `key` profile without `key_path`.
    pub fn from_profile(profile: &Profile, insecure: bool) -> Result<Self, SshError> {
        let mut options = Self::new(&profile.host, profile.port, &profile.user);
        options.insecure = insecure;
        options.identity_file = match profile.auth_type.as_str() {
            "key" => {
                let key = profile
                    .key_path
                    .as_deref()
                    .ok_or_else(|| SshError::MissingKey(profile.name.clone()))?;
                Some(expand_home(key))
            }
            "agent" => None,
            other => return Err(SshError::UnsupportedAuth(other.to_string())),
        };
        Ok(options)
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn without_multiplexing(mut self) -> Self {
        self.control_path = None;
        self
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options shared by every invocation, destination excluded
    pub fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
        ];

        if self.insecure {
            args.extend(
                ["-o", "StrictHostKeyChecking=no", "-o", "UserKnownHostsFile=/dev/null"]
                    .map(String::from),
            );
        } else {
            args.extend(["-o", "StrictHostKeyChecking=accept-new"].map(String::from));
        }

        if let Some(key) = &self.identity_file {
            args.push("-i".to_string());
            args.push(key.display().to_string());
            args.extend(["-o", "IdentitiesOnly=yes"].map(String::from));
        }

        if let Some(control) = &self.control_path {
            args.extend([
                "-o".to_string(),
                "ControlMaster=auto".to_string(),
                "-o".to_string(),
                format!("ControlPath={}", control.display()),
                "-o".to_string(),
                format!("ControlPersist={}", self.control_persist.as_secs()),
            ]);
        }

        args
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Quote `value` for a POSIX shell using single quotes
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}
