//! Backup and sync orchestration.
//!
//! The engine lists the device, builds the item tree against the ledger and
//! drives transfers item by item. A ledger record is written only after its
//! transfer fully completed, so a failed item looks untouched on the next
//! run.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::file::{discard, promote, temp_path};
use super::types::{ItemReport, Outcome};
use crate::codec::decode_notebook;
use crate::device::{
    check_status, ConnectionStatus, ControlChannel, ControlConnector, DataChannel, DataTransport,
    JobKind,
};
use crate::error::{Error, Result};
use crate::model::{Hint, Notebook};
use crate::storage::Ledger;
use crate::tree::{backup_hint, HintContext, ItemTree, Node};

/// Local directories the engine writes to.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub backup_dir: Option<PathBuf>,
    pub sync_dir: Option<PathBuf>,
}

pub struct SyncEngine<C, T, L> {
    control: ControlChannel<C>,
    data: DataChannel<T>,
    ledger: L,
    settings: EngineSettings,
}

impl<C, T, L> SyncEngine<C, T, L>
where
    C: ControlConnector,
    T: DataTransport,
    L: Ledger,
{
    pub fn new(
        control: ControlChannel<C>,
        data: DataChannel<T>,
        ledger: L,
        settings: EngineSettings,
    ) -> Self {
        Self {
            control,
            data,
            ledger,
            settings,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    #[must_use]
    pub const fn control(&self) -> &ControlChannel<C> {
        &self.control
    }

    /// Combined reachability of both channels.
    pub async fn status(&self) -> ConnectionStatus {
        check_status(&self.control, &self.data).await
    }

    /// Fail early with the classified error if `job` cannot run now.
    ///
    /// # Errors
    ///
    /// Returns the connection error blocking the job.
    pub async fn ensure_permitted(&self, job: JobKind) -> Result<ConnectionStatus> {
        let status = self.status().await;
        match status.blocking_error(job) {
            Some(e) => Err(e.into()),
            None => Ok(status),
        }
    }

    fn hint_context(&self) -> HintContext {
        HintContext {
            backup_root: self.settings.backup_dir.clone(),
            sync_root: self.settings.sync_dir.clone(),
        }
    }

    /// List the device and compute every hint.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or the ledger read fails.
    pub async fn refresh(&self) -> Result<ItemTree> {
        let items = self.control.list_items().await?;
        let entries = self.ledger.entries()?;
        let mut tree = ItemTree::build(items);
        tree.compute(&entries, &self.hint_context(), Path::exists);
        debug!(items = tree.len(), "Refreshed item tree");
        Ok(tree)
    }

    fn backup_dir(&self) -> Result<&Path> {
        self.settings
            .backup_dir
            .as_deref()
            .ok_or_else(|| Error::Config("no backup directory configured".to_string()))
    }

    /// Back up one item and, for folders, everything below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is unknown, no backup directory is
    /// configured, or the device becomes unreachable mid-run.
    pub async fn backup(&self, id: &str) -> Result<Vec<ItemReport>> {
        let tree = self.refresh().await?;
        let index = tree
            .index_of(id)
            .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?;
        let indices = tree.subtree(index);
        self.run_backups(&tree, &indices, true).await
    }

    /// Back up every live item that is new or changed since its last backup.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::backup`].
    pub async fn backup_all(&self) -> Result<Vec<ItemReport>> {
        let tree = self.refresh().await?;
        let indices: Vec<usize> = tree
            .roots()
            .iter()
            .flat_map(|&r| tree.subtree(r))
            .collect();
        self.run_backups(&tree, &indices, false).await
    }

    async fn run_backups(
        &self,
        tree: &ItemTree,
        indices: &[usize],
        force: bool,
    ) -> Result<Vec<ItemReport>> {
        let dest = self.backup_dir()?;
        tokio::fs::create_dir_all(dest).await?;
        let entries = self.ledger.entries()?;

        let mut reports = Vec::with_capacity(indices.len());
        for &i in indices {
            let node = tree.node(i);
            let item = &node.item;
            let entry = entries.get(&item.id).cloned().unwrap_or_default();

            if !force && backup_hint(item, &entry) == Hint::NONE {
                reports.push(ItemReport::new(&item.id, &item.name, Outcome::UpToDate));
                continue;
            }

            let outcome = match self.backup_item(&item.id, item.modified, dest).await {
                Ok(files) => Outcome::BackedUp { files },
                Err(e @ (Error::Connection(_) | Error::Database(_))) => return Err(e),
                Err(e) => {
                    warn!(id = %item.id, error = %e, "Backup failed");
                    Outcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(ItemReport::new(&item.id, &item.name, outcome));
        }
        Ok(reports)
    }

    async fn backup_item(&self, id: &str, modified: i64, dest: &Path) -> Result<usize> {
        let files = self.control.backup_item(id, dest).await?;
        self.ledger.upsert_backup(id, modified)?;
        Ok(files)
    }

    /// Sync one document, or every document below a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is unknown or the device becomes
    /// unreachable mid-run. Conflicts are reported per item.
    pub async fn sync(&self, id: &str) -> Result<Vec<ItemReport>> {
        let tree = self.refresh().await?;
        let index = tree
            .index_of(id)
            .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?;
        let indices = tree.subtree(index);
        self.run_syncs(&tree, &indices).await
    }

    /// Sync every live document that needs it.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::sync`].
    pub async fn sync_all(&self) -> Result<Vec<ItemReport>> {
        let tree = self.refresh().await?;
        let indices: Vec<usize> = tree
            .roots()
            .iter()
            .flat_map(|&r| tree.subtree(r))
            .collect();
        self.run_syncs(&tree, &indices).await
    }

    async fn run_syncs(&self, tree: &ItemTree, indices: &[usize]) -> Result<Vec<ItemReport>> {
        let mut reports = Vec::new();
        for &i in indices {
            let node = tree.node(i);
            if node.item.is_collection {
                continue;
            }
            let outcome = match self.sync_document(node).await {
                Ok(outcome) => outcome,
                Err(Error::ExistsInTarget { path, .. }) => Outcome::Conflict { path },
                Err(e @ (Error::Connection(_) | Error::Database(_))) => return Err(e),
                Err(e) => {
                    warn!(id = %node.item.id, error = %e, "Sync failed");
                    Outcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(ItemReport::new(&node.item.id, &node.item.name, outcome));
        }
        Ok(reports)
    }

    /// Download one document to its resolved target.
    ///
    /// # Errors
    ///
    /// Returns `ExistsInTarget` without touching the file when an untracked
    /// file occupies the target, or any transfer or ledger error.
    pub async fn sync_document(&self, node: &Node) -> Result<Outcome> {
        let item = &node.item;
        let Some(target) = node.target.as_deref() else {
            return Ok(Outcome::Skipped {
                reason: "no sync directory configured".to_string(),
            });
        };

        if node.sync_hint.contains(Hint::EXISTS_IN_TARGET) {
            return Err(Error::ExistsInTarget {
                id: item.id.clone(),
                path: target.to_path_buf(),
            });
        }
        if !node.sync_hint.needs_transfer() {
            return Ok(Outcome::UpToDate);
        }

        let previous = self.ledger.get(&item.id)?.sync.map(|r| r.path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = temp_path(target);
        let bytes = match self.data.download_document(&item.id, &temp).await {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };
        // the target may have been claimed since the tree was computed
        let ours = previous.as_deref() == Some(target);
        let occupied = match tokio::fs::try_exists(target).await {
            Ok(occupied) => occupied,
            Err(e) => {
                discard(&temp).await;
                return Err(e.into());
            }
        };
        if !ours && occupied {
            discard(&temp).await;
            return Err(Error::ExistsInTarget {
                id: item.id.clone(),
                path: target.to_path_buf(),
            });
        }
        promote(&temp, target).await?;
        self.ledger.upsert_sync(&item.id, item.modified, target)?;

        // the old copy was ours; drop it once the new one is recorded
        if let Some(old) = previous.filter(|old| old != target) {
            match tokio::fs::remove_file(&old).await {
                Ok(()) => debug!(id = %item.id, old = %old.display(), "Removed previous sync copy"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(old = %old.display(), error = %e, "Could not remove previous sync copy"),
            }
        }

        info!(id = %item.id, path = %target.display(), bytes, "Synced document");
        Ok(Outcome::Synced {
            path: target.to_path_buf(),
            bytes,
        })
    }

    /// Fetch and decode a notebook's pages.
    ///
    /// Pages without a page file are returned empty.
    ///
    /// # Errors
    ///
    /// Returns `NotANotebook` for other document types, or a decode error
    /// naming the first page that failed.
    pub async fn fetch_notebook(&self, id: &str) -> Result<Notebook> {
        let buffers = self.control.get_notebook_pages(id).await?;
        let pages = buffers.into_iter().map(|b| (b.id, b.data));
        Ok(decode_notebook(id, pages)?)
    }

    /// Upload a local PDF or EPUB through the data channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is rejected or the channel is down.
    pub async fn upload(&self, path: &Path, parent_id: Option<&str>) -> Result<()> {
        self.data.upload_file(path, parent_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::HEADER_V5;
    use crate::device::{ConnectionError, LocalConnector};
    use crate::storage::MemoryLedger;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Serves `<id>` downloads from fixed content; optionally fails.
    #[derive(Default)]
    struct FakeData {
        fail: bool,
        downloads: AtomicUsize,
    }

    impl DataTransport for FakeData {
        async fn probe(&self) -> Result<()> {
            Ok(())
        }

        async fn download_document(&self, id: &str, dest: &Path) -> Result<u64> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                tokio::fs::write(dest, b"partial").await?;
                return Err(ConnectionError::data_channel_disabled("cable pulled").into());
            }
            let body = format!("pdf:{id}");
            tokio::fs::write(dest, &body).await?;
            Ok(body.len() as u64)
        }

        async fn upload_file(&self, _path: &Path, _parent_id: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        remote: TempDir,
        local: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                remote: TempDir::new().unwrap(),
                local: TempDir::new().unwrap(),
            }
        }

        fn item(&self, id: &str, parent: &str, kind: &str, name: &str, modified: i64) {
            let json = serde_json::json!({
                "deleted": false,
                "lastModified": modified.to_string(),
                "parent": parent,
                "type": kind,
                "visibleName": name,
            });
            fs::write(
                self.remote.path().join(format!("{id}.metadata")),
                json.to_string(),
            )
            .unwrap();
        }

        fn backup_dir(&self) -> PathBuf {
            self.local.path().join("backup")
        }

        fn sync_dir(&self) -> PathBuf {
            self.local.path().join("sync")
        }

        fn engine(&self, data: FakeData) -> SyncEngine<LocalConnector, FakeData, MemoryLedger> {
            SyncEngine::new(
                ControlChannel::new(
                    LocalConnector::new(self.remote.path()),
                    self.remote.path().to_string_lossy(),
                ),
                DataChannel::new(data),
                MemoryLedger::new(),
                EngineSettings {
                    backup_dir: Some(self.backup_dir()),
                    sync_dir: Some(self.sync_dir()),
                },
            )
        }
    }

    const T1: i64 = 1_700_000_000_000;
    const T2: i64 = 1_700_000_500_000;

    #[tokio::test]
    async fn test_backup_twice_records_same_modification() {
        let fx = Fixture::new();
        fx.item("doc", "", "DocumentType", "Notes", T1);
        let engine = fx.engine(FakeData::default());

        for _ in 0..2 {
            let reports = engine.backup("doc").await.unwrap();
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].outcome, Outcome::BackedUp { files: 1 });
            let entry = engine.ledger().get("doc").unwrap();
            assert_eq!(entry.live_backup().map(|b| b.modified), Some(T1));
        }
        assert_eq!(fs::read_dir(fx.backup_dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_backup_all_skips_current_items() {
        let fx = Fixture::new();
        fx.item("a", "", "DocumentType", "A", T1);
        fx.item("b", "", "DocumentType", "B", T1);
        let engine = fx.engine(FakeData::default());

        let first = engine.backup_all().await.unwrap();
        assert!(first.iter().all(|r| matches!(r.outcome, Outcome::BackedUp { .. })));

        fx.item("b", "", "DocumentType", "B", T2);
        let second = engine.backup_all().await.unwrap();
        let outcomes: Vec<_> = second.iter().map(|r| (r.id.as_str(), &r.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                ("a", &Outcome::UpToDate),
                ("b", &Outcome::BackedUp { files: 1 })
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_writes_target_and_ledger() {
        let fx = Fixture::new();
        fx.item("f", "", "CollectionType", "Work", T1);
        fx.item("d", "f", "DocumentType", "Plan", T1);
        let engine = fx.engine(FakeData::default());

        let reports = engine.sync_all().await.unwrap();
        let target = fx.sync_dir().join("Work").join("Plan.pdf");
        assert_eq!(reports.len(), 1);
        assert!(matches!(&reports[0].outcome, Outcome::Synced { path, .. } if *path == target));
        assert_eq!(fs::read_to_string(&target).unwrap(), "pdf:d");
        assert_eq!(engine.ledger().get("d").unwrap().sync.unwrap().path, target);

        // nothing changed: the second run transfers nothing
        let reports = engine.sync_all().await.unwrap();
        assert_eq!(reports[0].outcome, Outcome::UpToDate);
    }

    #[tokio::test]
    async fn test_sync_never_overwrites_untracked_file() {
        let fx = Fixture::new();
        fx.item("d", "", "DocumentType", "Plan", T1);
        fs::create_dir_all(fx.sync_dir()).unwrap();
        fs::write(fx.sync_dir().join("Plan.pdf"), b"mine").unwrap();
        let engine = fx.engine(FakeData::default());

        let reports = engine.sync("d").await.unwrap();
        assert!(matches!(reports[0].outcome, Outcome::Conflict { .. }));
        assert_eq!(fs::read(fx.sync_dir().join("Plan.pdf")).unwrap(), b"mine");
        assert!(engine.ledger().get("d").unwrap().sync.is_none());
    }

    #[tokio::test]
    async fn test_moved_document_keeps_foreign_file_at_new_path() {
        let fx = Fixture::new();
        fx.item("f", "", "CollectionType", "Work", T1);
        fx.item("g", "", "CollectionType", "Home", T1);
        fx.item("d", "f", "DocumentType", "Plan", T1);
        let engine = fx.engine(FakeData::default());
        engine.sync_all().await.unwrap();

        fx.item("d", "g", "DocumentType", "Plan", T2);
        let foreign = fx.sync_dir().join("Home").join("Plan.pdf");
        fs::create_dir_all(foreign.parent().unwrap()).unwrap();
        fs::write(&foreign, b"mine").unwrap();

        let reports = engine.sync("d").await.unwrap();
        assert!(matches!(&reports[0].outcome, Outcome::Conflict { path } if *path == foreign));
        assert_eq!(fs::read(&foreign).unwrap(), b"mine");
        let old = fx.sync_dir().join("Work").join("Plan.pdf");
        assert_eq!(engine.ledger().get("d").unwrap().sync.unwrap().path, old);
        assert!(old.exists());
        let leftovers = fs::read_dir(foreign.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_record_and_no_file() {
        let fx = Fixture::new();
        fx.item("d", "", "DocumentType", "Plan", T1);
        let engine = fx.engine(FakeData {
            fail: true,
            ..FakeData::default()
        });

        let err = engine.sync("d").await.unwrap_err();
        assert_eq!(err.error_code(), crate::error::ErrorCode::DataChannelDisabled);
        assert!(engine.ledger().get("d").unwrap().sync.is_none());
        let leftovers: Vec<_> = fs::read_dir(fx.sync_dir()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_moved_document_replaces_previous_copy() {
        let fx = Fixture::new();
        fx.item("f", "", "CollectionType", "Work", T1);
        fx.item("g", "", "CollectionType", "Home", T1);
        fx.item("d", "f", "DocumentType", "Plan", T1);
        let engine = fx.engine(FakeData::default());
        engine.sync_all().await.unwrap();

        fx.item("d", "g", "DocumentType", "Plan", T2);
        let reports = engine.sync("d").await.unwrap();
        assert!(matches!(reports[0].outcome, Outcome::Synced { .. }));
        assert!(fx.sync_dir().join("Home").join("Plan.pdf").exists());
        assert!(!fx.sync_dir().join("Work").join("Plan.pdf").exists());
    }

    #[tokio::test]
    async fn test_fetch_notebook_decodes_pages() {
        let fx = Fixture::new();
        fs::write(
            fx.remote.path().join("n.content"),
            br#"{"fileType":"notebook","formatVersion":1,"pages":["p1","p2"]}"#,
        )
        .unwrap();
        fs::create_dir_all(fx.remote.path().join("n")).unwrap();
        let mut page = HEADER_V5.as_bytes().to_vec();
        page.extend_from_slice(&1i32.to_le_bytes()); // one layer
        page.extend_from_slice(&0i32.to_le_bytes()); // no lines
        fs::write(fx.remote.path().join("n").join("p1.rm"), page).unwrap();

        let engine = fx.engine(FakeData::default());
        let notebook = engine.fetch_notebook("n").await.unwrap();
        assert_eq!(notebook.pages.len(), 2);
        assert!(notebook.pages.iter().all(|p| p.lines.is_empty()));
        assert_eq!(notebook.pages[1].id, "p2");
    }

    #[tokio::test]
    async fn test_fetch_notebook_names_broken_page() {
        let fx = Fixture::new();
        fs::write(
            fx.remote.path().join("n.content"),
            br#"{"fileType":"notebook","formatVersion":1,"pages":["p1"]}"#,
        )
        .unwrap();
        fs::create_dir_all(fx.remote.path().join("n")).unwrap();
        fs::write(fx.remote.path().join("n").join("p1.rm"), b"garbage").unwrap();

        let engine = fx.engine(FakeData::default());
        let err = engine.fetch_notebook("n").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(crate::codec::DecodeError::Page { ref page_id, .. }) if page_id == "p1"
        ));
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let fx = Fixture::new();
        let engine = fx.engine(FakeData::default());
        assert!(matches!(
            engine.backup("nope").await,
            Err(Error::ItemNotFound { .. })
        ));
    }
}
