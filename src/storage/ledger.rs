//! The sync ledger: what was backed up or synced, and where.
//!
//! Backends implement [`Ledger`]. [`SqliteLedger`](super::SqliteLedger) is the
//! persistent one; [`MemoryLedger`] backs tests and dry runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::events::{Event, EventType};
use crate::error::Result;

/// Last backed-up modification of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub id: String,
    pub modified: i64,
    /// Set when the backup location was reconfigured; the record no longer
    /// vouches for a file on disk.
    pub deleted_at: Option<i64>,
}

impl BackupRecord {
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Last synced modification of one item and the file it went to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRecord {
    pub id: String,
    pub modified: i64,
    pub path: PathBuf,
}

/// Everything the ledger knows about one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub backup: Option<BackupRecord>,
    pub sync: Option<SyncRecord>,
    /// Explicit sync target directory.
    pub target: Option<PathBuf>,
}

impl LedgerEntry {
    /// The backup record, ignoring invalidated ones.
    #[must_use]
    pub fn live_backup(&self) -> Option<&BackupRecord> {
        self.backup.as_ref().filter(|b| !b.is_deleted())
    }
}

/// Persistent record of backups, syncs and target overrides.
///
/// Every mutation is atomic: either all of its rows (and its history event)
/// are written or none are.
pub trait Ledger: Send + Sync {
    /// Look up one item. Unknown ids yield an empty entry.
    fn get(&self, id: &str) -> Result<LedgerEntry>;

    /// Load every entry in one pass, keyed by item id.
    fn entries(&self) -> Result<HashMap<String, LedgerEntry>>;

    /// Record a completed backup. Clears any invalidation marker.
    fn upsert_backup(&self, id: &str, modified: i64) -> Result<()>;

    /// Record a completed sync to `path`.
    fn upsert_sync(&self, id: &str, modified: i64, path: &Path) -> Result<()>;

    /// Set or clear the explicit target directory of an item.
    fn set_override(&self, id: &str, directory: Option<&Path>) -> Result<()>;

    /// Invalidate every backup record, returning how many were live.
    fn clear_all_backups(&self) -> Result<usize>;

    fn list_backups(&self) -> Result<Vec<BackupRecord>>;

    fn list_syncs(&self) -> Result<Vec<SyncRecord>>;

    /// Recent history of an item, newest first.
    fn history(&self, id: &str, limit: Option<u32>) -> Result<Vec<Event>>;
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ── In-memory ledger ──────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    backups: HashMap<String, BackupRecord>,
    syncs: HashMap<String, SyncRecord>,
    targets: HashMap<String, PathBuf>,
    events: Vec<Event>,
}

impl MemoryState {
    fn entry(&self, id: &str) -> LedgerEntry {
        LedgerEntry {
            backup: self.backups.get(id).cloned(),
            sync: self.syncs.get(id).cloned(),
            target: self.targets.get(id).cloned(),
        }
    }

    fn push_event(&mut self, event: Event) {
        let mut event = event;
        event.id = i64::try_from(self.events.len()).unwrap_or(i64::MAX) + 1;
        self.events.push(event);
    }
}

/// Ledger kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl Ledger for MemoryLedger {
    fn get(&self, id: &str) -> Result<LedgerEntry> {
        Ok(self.with_state(|s| s.entry(id)))
    }

    fn entries(&self) -> Result<HashMap<String, LedgerEntry>> {
        Ok(self.with_state(|s| {
            s.backups
                .keys()
                .chain(s.syncs.keys())
                .chain(s.targets.keys())
                .map(|id| (id.clone(), s.entry(id)))
                .collect()
        }))
    }

    fn upsert_backup(&self, id: &str, modified: i64) -> Result<()> {
        self.with_state(|s| {
            let old = s.backups.get(id).map(|b| b.modified.to_string());
            s.backups.insert(
                id.to_string(),
                BackupRecord {
                    id: id.to_string(),
                    modified,
                    deleted_at: None,
                },
            );
            s.push_event(
                Event::new(id, EventType::BackupRecorded)
                    .with_values(old, Some(modified.to_string())),
            );
        });
        Ok(())
    }

    fn upsert_sync(&self, id: &str, modified: i64, path: &Path) -> Result<()> {
        self.with_state(|s| {
            let old = s.syncs.get(id).map(|r| r.path.display().to_string());
            s.syncs.insert(
                id.to_string(),
                SyncRecord {
                    id: id.to_string(),
                    modified,
                    path: path.to_path_buf(),
                },
            );
            s.push_event(
                Event::new(id, EventType::SyncRecorded)
                    .with_values(old, Some(path.display().to_string())),
            );
        });
        Ok(())
    }

    fn set_override(&self, id: &str, directory: Option<&Path>) -> Result<()> {
        self.with_state(|s| {
            let old = match directory {
                Some(dir) => s.targets.insert(id.to_string(), dir.to_path_buf()),
                None => s.targets.remove(id),
            }
            .map(|p| p.display().to_string());
            let event = match directory {
                Some(dir) => Event::new(id, EventType::TargetSet)
                    .with_values(old, Some(dir.display().to_string())),
                None => Event::new(id, EventType::TargetCleared).with_values(old, None),
            };
            s.push_event(event);
        });
        Ok(())
    }

    fn clear_all_backups(&self) -> Result<usize> {
        Ok(self.with_state(|s| {
            let now = now_ms();
            let mut cleared = Vec::new();
            for record in s.backups.values_mut().filter(|b| b.deleted_at.is_none()) {
                record.deleted_at = Some(now);
                cleared.push(record.id.clone());
            }
            for id in &cleared {
                s.push_event(Event::new(id, EventType::BackupInvalidated));
            }
            cleared.len()
        }))
    }

    fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        Ok(self.with_state(|s| {
            let mut out: Vec<_> = s.backups.values().cloned().collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            out
        }))
    }

    fn list_syncs(&self) -> Result<Vec<SyncRecord>> {
        Ok(self.with_state(|s| {
            let mut out: Vec<_> = s.syncs.values().cloned().collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            out
        }))
    }

    fn history(&self, id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
        let limit = limit.unwrap_or(100) as usize;
        Ok(self.with_state(|s| {
            s.events
                .iter()
                .rev()
                .filter(|e| e.item_id == id)
                .take(limit)
                .cloned()
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_is_empty_entry() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.get("nope").unwrap(), LedgerEntry::default());
    }

    #[test]
    fn test_upsert_backup_clears_marker() {
        let ledger = MemoryLedger::new();
        ledger.upsert_backup("a", 10).unwrap();
        assert_eq!(ledger.clear_all_backups().unwrap(), 1);
        assert!(ledger.get("a").unwrap().live_backup().is_none());

        // already invalidated records are not counted twice
        assert_eq!(ledger.clear_all_backups().unwrap(), 0);

        ledger.upsert_backup("a", 20).unwrap();
        let entry = ledger.get("a").unwrap();
        assert_eq!(entry.live_backup().map(|b| b.modified), Some(20));
    }

    #[test]
    fn test_override_set_and_clear() {
        let ledger = MemoryLedger::new();
        ledger.set_override("a", Some(Path::new("/tmp/out"))).unwrap();
        assert_eq!(
            ledger.get("a").unwrap().target,
            Some(PathBuf::from("/tmp/out"))
        );
        ledger.set_override("a", None).unwrap();
        assert!(ledger.get("a").unwrap().target.is_none());

        let history = ledger.history("a", None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, EventType::TargetCleared);
        assert_eq!(history[0].old_value.as_deref(), Some("/tmp/out"));
    }

    #[test]
    fn test_entries_merges_tables() {
        let ledger = MemoryLedger::new();
        ledger.upsert_backup("a", 1).unwrap();
        ledger.upsert_sync("a", 2, Path::new("/s/a.pdf")).unwrap();
        ledger.set_override("b", Some(Path::new("/t"))).unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["a"].sync.as_ref().map(|s| s.modified), Some(2));
        assert!(entries["a"].backup.is_some());
        assert!(entries["b"].backup.is_none());
    }
}
