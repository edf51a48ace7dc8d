//! Control channel served from a local directory.
//!
//! Treats a directory (an offline copy of the device's document store, or a
//! test fixture) as the remote. Absolute remote paths map straight onto the
//! local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::connection::ConnectionError;
use super::control::{ControlConnector, ControlSession};
use super::model::MACHINE_PATH;
use crate::error::{Error, Result};

/// Machine string reported when none is configured.
const DEFAULT_MACHINE: &str = "reMarkable 2.0";

#[derive(Debug, Clone)]
pub struct LocalConnector {
    root: PathBuf,
    machine: String,
}

impl LocalConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            machine: DEFAULT_MACHINE.to_string(),
        }
    }

    /// Report `machine` as the device identification string.
    #[must_use]
    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = machine.into();
        self
    }
}

impl ControlConnector for LocalConnector {
    type Session = LocalSession;

    async fn connect(&self) -> Result<LocalSession> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(LocalSession {
                root: self.root.clone(),
                machine: self.machine.clone(),
            }),
            Ok(_) => Err(ConnectionError::not_configured(format!(
                "{} is not a directory",
                self.root.display()
            ))
            .into()),
            Err(e) => Err(ConnectionError::not_connected(format!(
                "{}: {e}",
                self.root.display()
            ))
            .into()),
        }
    }
}

#[derive(Debug)]
pub struct LocalSession {
    root: PathBuf,
    machine: String,
}

impl ControlSession for LocalSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        if command == format!("cat {MACHINE_PATH}") {
            return Ok(format!("{}\n", self.machine));
        }

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::Other(format!(
                "command `{command}` failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn remove_file(&mut self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn list_files(&mut self, dir: &str, prefix: &str) -> Result<Vec<String>> {
        let base = PathBuf::from(dir);
        let mut pending = vec![base.clone()];
        let mut found = Vec::new();

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let Ok(relative) = path.strip_prefix(&base) else {
                    continue;
                };
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    // only descend where a match is still possible
                    if prefix.starts_with(&format!("{relative}/"))
                        || relative.starts_with(prefix)
                    {
                        pending.push(path);
                    }
                } else if file_type.is_file() && relative.starts_with(prefix) {
                    found.push(relative);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
