//! Control channel: remote file tree, metadata and shell commands.
//!
//! A [`ControlConnector`] opens sessions; [`ControlChannel`] wraps one and
//! serializes every operation behind a single async mutex. Each operation
//! connects, does its work and drops the session, so a failed connect never
//! leaves a half-open session behind.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::metadata::{parse_content, parse_metadata};
use super::model::{DeviceType, MACHINE_PATH};
use crate::error::{Error, Result};
use crate::model::{inherit_trash, RemoteItem};

/// Default location of the document store on the device.
pub const DEFAULT_REMOTE_ROOT: &str = "/home/root/.local/share/remarkable/xochitl";

/// An open session on the device.
///
/// Paths are remote, `/`-separated strings.
pub trait ControlSession: Send {
    /// Run a shell command and return its standard output.
    fn run(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    fn read_file(&mut self, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn write_file(&mut self, path: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    fn remove_file(&mut self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Regular files under `dir`, recursively, whose path relative to `dir`
    /// starts with `prefix`. Returned paths are relative and sorted.
    fn list_files(
        &mut self,
        dir: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Opens control sessions.
pub trait ControlConnector: Send + Sync {
    type Session: ControlSession;

    /// Establish a session, classifying failures as not-configured or
    /// not-connected.
    fn connect(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// One page of a notebook as stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBuffer {
    pub id: String,
    /// `None` for pages that were never drawn on; the device writes no file.
    pub data: Option<Vec<u8>>,
}

/// Single-flight control channel.
pub struct ControlChannel<C> {
    connector: C,
    remote_root: String,
    gate: Arc<Mutex<()>>,
}

impl<C: ControlConnector> ControlChannel<C> {
    pub fn new(connector: C, remote_root: impl Into<String>) -> Self {
        Self {
            connector,
            remote_root: remote_root.into().trim_end_matches('/').to_string(),
            gate: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    fn remote_path(&self, name: &str) -> String {
        format!("{}/{name}", self.remote_root)
    }

    /// Check that a session can be opened.
    ///
    /// # Errors
    ///
    /// Returns the classified connection error.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.gate.lock().await;
        self.connector.connect().await?;
        Ok(())
    }

    /// Identify the device model.
    ///
    /// Unknown machine strings fall back to the default model, since only
    /// the page resolution depends on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be reached.
    pub async fn detect_device(&self) -> Result<DeviceType> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;
        let machine = session.run(&format!("cat {MACHINE_PATH}")).await?;
        Ok(DeviceType::from_machine(&machine).unwrap_or_else(|| {
            warn!(machine = machine.trim(), "Unrecognized device, assuming default model");
            DeviceType::default()
        }))
    }

    /// List every live item on the device.
    ///
    /// Soft-deleted records are dropped and trash is inherited down each
    /// folder chain.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or malformed metadata.
    pub async fn list_items(&self) -> Result<Vec<RemoteItem>> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;

        let names = session.list_files(&self.remote_root, "").await?;
        let mut items = Vec::new();
        for name in names {
            if name.contains('/') {
                continue;
            }
            let Some(id) = name.strip_suffix(".metadata") else {
                continue;
            };
            let json = session.read_file(&self.remote_path(&name)).await?;
            if let Some(item) = parse_metadata(id, &json)? {
                items.push(item);
            }
        }

        inherit_trash(&mut items);
        debug!(count = items.len(), "Listed device items");
        Ok(items)
    }

    /// Read the ordered live pages of a notebook.
    ///
    /// # Errors
    ///
    /// Returns `NotANotebook` for PDFs and EPUBs, or an error on malformed
    /// content or connection failure.
    pub async fn get_notebook_pages(&self, id: &str) -> Result<Vec<PageBuffer>> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;

        let content = session
            .read_file(&self.remote_path(&format!("{id}.content")))
            .await?;
        let page_ids = parse_content(id, &content)?;

        let present = session
            .list_files(&self.remote_root, &format!("{id}/"))
            .await?;

        let mut pages = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            let relative = format!("{id}/{page_id}.rm");
            let data = if present.contains(&relative) {
                Some(session.read_file(&self.remote_path(&relative)).await?)
            } else {
                None
            };
            pages.push(PageBuffer { id: page_id, data });
        }
        Ok(pages)
    }

    /// Mirror every remote file prefixed by `id` into `dest`.
    ///
    /// Local entries with the same prefix are removed first, so repeated
    /// backups never accumulate stale pages. Returns the number of files
    /// copied.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or any local I/O failure. A
    /// failed transfer may leave a partial mirror; the caller must not
    /// record it.
    pub async fn backup_item(&self, id: &str, dest: &Path) -> Result<usize> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;

        let files = session.list_files(&self.remote_root, id).await?;
        if files.is_empty() {
            return Err(Error::ItemNotFound { id: id.to_string() });
        }

        let purged = crate::sync::file::purge_prefix(dest, id).await?;
        if purged > 0 {
            debug!(id, purged, "Removed previous backup entries");
        }

        for relative in &files {
            let data = session.read_file(&self.remote_path(relative)).await?;
            let local = local_path(dest, relative);
            if let Some(parent) = local.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&local, data).await?;
        }

        info!(id, files = files.len(), dest = %dest.display(), "Backed up item");
        Ok(files.len())
    }

    /// Write a file on the device, relative to the document store unless
    /// `path` is absolute.
    ///
    /// # Errors
    ///
    /// Returns an error on connection or write failure.
    pub async fn write_remote_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;
        session.write_file(&self.resolve(path), data).await
    }

    /// Delete a file on the device. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure.
    pub async fn delete_remote_file(&self, path: &str) -> Result<()> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;
        session.remove_file(&self.resolve(path)).await
    }

    /// Run a shell command on the device and return its output.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a non-zero exit.
    pub async fn run_remote_command(&self, command: &str) -> Result<String> {
        let _guard = self.gate.lock().await;
        let mut session = self.connector.connect().await?;
        session.run(command).await
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            self.remote_path(path)
        }
    }
}

fn local_path(dest: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(dest.to_path_buf(), |acc, part| acc.join(part))
}
