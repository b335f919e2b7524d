//! SshRemoteStorage - IRemoteStorage implementation over the system ssh client
//!
//! ## Design Notes
//!
//! - File content travels over the ssh channel's stdin/stdout (`cat`), so
//!   no scp or sftp subsystem is needed on the remote.
//! - Listings rely on GNU `find -printf` on the remote host.
//! - Downloads land in a sibling part file and are renamed into place, so an
//!   interrupted transfer never leaves a truncated file under the real name.
//! - Exit status 255 is ssh's own failure; anything else comes from the
//!   remote command.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use ibridge_core::domain::paths::remote_parent;
use ibridge_core::ports::{IRemoteStorage, RemoteEntry};

use crate::listing::{self, FIND_FORMAT};
use crate::options::{shell_quote, SshOptions};
use crate::SshError;

const SSH_FAILURE_STATUS: i32 = 255;

/// Remote storage reached through `ssh`
#[derive(Debug, Clone)]
pub struct SshRemoteStorage {
    options: SshOptions,
}

impl SshRemoteStorage {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SshOptions {
        &self.options
    }

    /// Open (or reuse) the connection and run a no-op
    ///
    /// # Errors
    /// Returns [`SshError::ConnectionFailed`] when the host is unreachable or
    /// refuses authentication.
    #[instrument(skip(self), fields(destination = %self.options.destination()))]
    pub async fn check_connection(&self) -> Result<(), SshError> {
        self.run("true").await?;
        info!("Connection established");
        Ok(())
    }

    /// Whether `remote_path` exists on the host
    pub async fn exists(&self, remote_path: &str) -> Result<bool, SshError> {
        let output = self
            .command()
            .arg(format!("test -e {}", shell_quote(remote_path)))
            .output()
            .await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(self.failure("test -e", &output)),
        }
    }

    /// Tear down the multiplexing master, if one is running
    pub async fn close(&self) {
        if self.options.control_path.is_none() {
            return;
        }
        let result = Command::new(&self.options.program)
            .args(self.options.base_args())
            .args(["-O", "exit"])
            .arg(self.options.destination())
            .stdin(Stdio::null())
            .output()
            .await;
        match result {
            Ok(output) if output.status.success() => debug!("Control connection closed"),
            Ok(output) => debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "No control connection to close"
            ),
            Err(e) => debug!(error = %e, "Failed to run ssh -O exit"),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.options.program);
        cmd.args(self.options.base_args())
            .arg(self.options.destination())
            .kill_on_drop(true);
        cmd
    }

    /// Run `remote_command` with no input and return its stdout
    async fn run(&self, remote_command: &str) -> Result<Vec<u8>, SshError> {
        debug!(command = remote_command, "ssh exec");
        let output = self
            .command()
            .arg(remote_command)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(self.failure(remote_command, &output))
        }
    }

    fn failure(&self, command: &str, output: &Output) -> SshError {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(SSH_FAILURE_STATUS) | None => SshError::ConnectionFailed {
                destination: self.options.destination(),
                message: stderr,
            },
            Some(status) => SshError::CommandFailed {
                command: command.to_string(),
                status,
                stderr,
            },
        }
    }
}

/// `mkdir -p` the parent, write stdin to the file, apply `mode`
fn upload_command(remote_path: &str, mode: u32) -> String {
    let quoted = shell_quote(remote_path);
    let mkdir = remote_parent(remote_path)
        .map(|parent| format!("mkdir -p {} && ", shell_quote(&parent)))
        .unwrap_or_default();
    format!("{mkdir}cat > {quoted} && chmod {mode:o} {quoted}")
}

fn list_command(remote_dir: &str) -> String {
    format!(
        "find {} -mindepth 1 -maxdepth 1 -printf '{FIND_FORMAT}'",
        shell_quote(remote_dir)
    )
}

fn stat_command(remote_path: &str) -> String {
    format!(
        "find {} -maxdepth 0 -printf '{FIND_FORMAT}'",
        shell_quote(remote_path)
    )
}

fn remove_command(remote_path: &str) -> String {
    let quoted = shell_quote(remote_path);
    format!("if [ -d {quoted} ]; then rmdir {quoted}; else rm -f {quoted}; fi")
}

fn part_path(local_path: &Path) -> PathBuf {
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    local_path.with_file_name(format!(".{name}.ibridge-part"))
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[async_trait]
impl IRemoteStorage for SshRemoteStorage {
    #[instrument(skip(self), fields(local = %local_path.display()))]
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let mut file = tokio::fs::File::open(local_path)
            .await
            .with_context(|| format!("Failed to open {}", local_path.display()))?;
        let mode = file_mode(&file.metadata().await?);
        let command = upload_command(remote_path, mode);

        let mut child = self
            .command()
            .arg(&command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SshError::from)?;

        let mut stdin = child
            .stdin
            .take()
            .context("ssh child has no stdin")?;
        let copied = tokio::io::copy(&mut file, &mut stdin).await;
        drop(stdin);

        let output = child.wait_with_output().await.map_err(SshError::from)?;
        if !output.status.success() {
            return Err(self.failure(&command, &output).into());
        }
        let bytes = copied.with_context(|| format!("Failed to stream {}", local_path.display()))?;

        debug!(remote = remote_path, bytes, "Uploaded");
        Ok(())
    }

    #[instrument(skip(self), fields(local = %local_path.display()))]
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part = part_path(local_path);
        let command = format!("cat {}", shell_quote(remote_path));

        let mut child = self
            .command()
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SshError::from)?;

        let mut stdout = child.stdout.take().context("ssh child has no stdout")?;
        let mut stderr = child.stderr.take().context("ssh child has no stderr")?;
        let mut file = tokio::fs::File::create(&part)
            .await
            .with_context(|| format!("Failed to create {}", part.display()))?;

        let mut err_buf = Vec::new();
        let (copied, _) = tokio::join!(
            tokio::io::copy(&mut stdout, &mut file),
            stderr.read_to_end(&mut err_buf)
        );
        let status = child.wait().await.map_err(SshError::from)?;
        drop(file);

        let output = Output {
            status,
            stdout: Vec::new(),
            stderr: err_buf,
        };
        let result: Result<u64> = if !output.status.success() {
            Err(self.failure(&command, &output).into())
        } else {
            copied.with_context(|| format!("Failed to write {}", part.display()))
        };

        match result {
            Ok(bytes) => {
                tokio::fs::rename(&part, local_path).await.with_context(|| {
                    format!("Failed to move download into {}", local_path.display())
                })?;
                debug!(remote = remote_path, bytes, "Downloaded");
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn make_dir_all(&self, remote_path: &str) -> Result<()> {
        self.run(&format!("mkdir -p {}", shell_quote(remote_path)))
            .await?;
        Ok(())
    }

    async fn remove(&self, remote_path: &str) -> Result<()> {
        self.run(&remove_command(remote_path)).await?;
        Ok(())
    }

    async fn stat(&self, remote_path: &str) -> Result<RemoteEntry> {
        let stdout = self.run(&stat_command(remote_path)).await?;
        let text = String::from_utf8_lossy(&stdout);
        listing::parse_listing(&text)?
            .into_iter()
            .next()
            .with_context(|| format!("No such file or directory: {remote_path}"))
    }

    async fn list_directory(&self, remote_path: &str) -> Result<Vec<RemoteEntry>> {
        let stdout = self.run(&list_command(remote_path)).await?;
        Ok(listing::parse_listing(&String::from_utf8_lossy(&stdout))?)
    }

    async fn exec(&self, command: &str) -> Result<String> {
        let stdout = self.run(command).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
