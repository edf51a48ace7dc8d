//! Control channel over the system OpenSSH client.
//!
//! Every session operation runs one `ssh` invocation in batch mode, so no
//! password prompt can ever block. Connection failures surface as exit
//! status 255 and are classified from the client's stderr.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use super::connection::ConnectionError;
use super::control::{ControlConnector, ControlSession};
use crate::error::{Error, Result};

/// Exit status OpenSSH uses for its own failures.
const SSH_FAILURE: i32 = 255;

/// How to reach the device.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity: Option<PathBuf>,
    pub connect_timeout: Duration,
}

impl SshTarget {
    fn command(&self, remote: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)))
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-p")
            .arg(self.port.to_string());
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(format!("{}@{}", self.user, self.host))
            .arg(remote)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn exec(&self, remote: &str, input: Option<&[u8]>) -> Result<Vec<u8>> {
        trace!(host = %self.host, command = remote, "ssh exec");
        let mut cmd = self.command(remote);
        if input.is_some() {
            cmd.stdin(Stdio::piped());
        }
        let mut child = cmd.spawn().map_err(|e| {
            ConnectionError::not_configured(format!("cannot start the ssh client: {e}"))
        })?;

        if let (Some(data), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(data).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.code() == Some(SSH_FAILURE) {
            return Err(classify_ssh_failure(&stderr).into());
        }
        Err(Error::Other(format!("remote command `{remote}` failed: {stderr}")))
    }
}

/// Classify an OpenSSH failure from its stderr.
#[must_use]
pub fn classify_ssh_failure(stderr: &str) -> ConnectionError {
    const CREDENTIAL_MARKERS: &[&str] = &[
        "Permission denied",
        "Host key verification failed",
        "Too many authentication failures",
        "no such identity",
    ];

    let message = if stderr.is_empty() {
        "ssh exited with status 255".to_string()
    } else {
        stderr.to_string()
    };
    if CREDENTIAL_MARKERS.iter().any(|m| stderr.contains(m)) {
        ConnectionError::not_configured(message)
    } else {
        ConnectionError::not_connected(message)
    }
}

/// Quote a string for a POSIX shell.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug, Clone)]
pub struct SshConnector {
    target: SshTarget,
}

impl SshConnector {
    #[must_use]
    pub const fn new(target: SshTarget) -> Self {
        Self { target }
    }
}

impl ControlConnector for SshConnector {
    type Session = SshSession;

    async fn connect(&self) -> Result<SshSession> {
        // ConnectTimeout only covers the TCP handshake
        let limit = self.target.connect_timeout + Duration::from_secs(2);
        match tokio::time::timeout(limit, self.target.exec("true", None)).await {
            Ok(Ok(_)) => {
                debug!(host = %self.target.host, "ssh session ready");
                Ok(SshSession {
                    target: self.target.clone(),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ConnectionError::not_connected(format!(
                "{} did not answer within {}s",
                self.target.host,
                limit.as_secs()
            ))
            .into()),
        }
    }
}

#[derive(Debug)]
pub struct SshSession {
    target: SshTarget,
}

impl ControlSession for SshSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        let out = self.target.exec(command, None).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        self.target
            .exec(&format!("cat -- {}", shell_quote(path)), None)
            .await
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let dir = path.rsplit_once('/').map_or(".", |(dir, _)| dir);
        let command = format!(
            "mkdir -p -- {} && cat > {}",
            shell_quote(if dir.is_empty() { "/" } else { dir }),
            shell_quote(path)
        );
        self.target.exec(&command, Some(data)).await?;
        Ok(())
    }

    async fn remove_file(&mut self, path: &str) -> Result<()> {
        self.target
            .exec(&format!("rm -f -- {}", shell_quote(path)), None)
            .await?;
        Ok(())
    }

    async fn list_files(&mut self, dir: &str, prefix: &str) -> Result<Vec<String>> {
        let command = format!(
            "cd {} && find . -type f -path {}",
            shell_quote(dir),
            shell_quote(&format!("./{prefix}*"))
        );
        let out = self.target.exec(&command, None).await?;
        let mut files: Vec<String> = String::from_utf8_lossy(&out)
            .lines()
            .filter_map(|line| line.strip_prefix("./"))
            .filter(|line| line.starts_with(prefix))
            .map(str::to_string)
            .collect();
        files.sort();
        Ok(files)
    }
}
