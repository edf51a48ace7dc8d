//! SQLite ledger implementation.
//!
//! Each logical operation opens its own connection and drops it when done,
//! so the database file is never held open across device transfers. Writes
//! follow the `mutate` protocol: an IMMEDIATE transaction, the change, its
//! history events, then commit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::debug;

use super::events::{get_events, insert_event, Event, EventType};
use super::ledger::{now_ms, BackupRecord, Ledger, LedgerEntry, SyncRecord};
use super::schema::apply_schema;
use crate::error::{Error, Result};

/// Busy timeout for ledger connections.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Side effects collected while a mutation runs.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: &'static str,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub const fn new(op_name: &'static str) -> Self {
        Self {
            op_name,
            events: Vec::new(),
        }
    }

    /// Record an event with old/new values.
    pub fn record_change(
        &mut self,
        item_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events
            .push(Event::new(item_id, event_type).with_values(old_value, new_value));
    }
}

/// Ledger stored in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    path: PathBuf,
}

impl SqliteLedger {
    /// Open (and if needed create) the ledger at `path`.
    ///
    /// The schema is applied once here so later operations can assume it.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let ledger = Self {
            path: path.to_path_buf(),
        };
        let conn = ledger.connect()?;
        apply_schema(&conn)?;
        debug!(path = %path.display(), "Opened ledger");
        Ok(ledger)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Run `f` inside an IMMEDIATE transaction and write its events.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails; the transaction is rolled back.
    pub fn mutate<F, R>(&self, op: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }
        tx.commit()?;

        debug!(op = ctx.op_name, events = ctx.events.len(), "Ledger mutation committed");
        Ok(result)
    }

    fn read<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let conn = self.connect()?;
        f(&conn)
    }
}

fn path_from_sql(raw: String) -> PathBuf {
    PathBuf::from(raw)
}

fn path_to_sql(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument(format!("non UTF-8 path: {}", path.display())))
}

fn backup_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackupRecord> {
    Ok(BackupRecord {
        id: row.get(0)?,
        modified: row.get(1)?,
        deleted_at: row.get(2)?,
    })
}

fn sync_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncRecord> {
    Ok(SyncRecord {
        id: row.get(0)?,
        modified: row.get(1)?,
        path: path_from_sql(row.get(2)?),
    })
}

impl Ledger for SqliteLedger {
    fn get(&self, id: &str) -> Result<LedgerEntry> {
        self.read(|conn| {
            let backup = conn
                .query_row(
                    "SELECT id, modified, deleted_at FROM backups WHERE id = ?1",
                    [id],
                    backup_from_row,
                )
                .optional()?;
            let sync = conn
                .query_row(
                    "SELECT id, modified, path FROM syncs WHERE id = ?1",
                    [id],
                    sync_from_row,
                )
                .optional()?;
            let target = conn
                .query_row(
                    "SELECT directory FROM sync_targets WHERE id = ?1",
                    [id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .map(path_from_sql);
            Ok(LedgerEntry {
                backup,
                sync,
                target,
            })
        })
    }

    fn entries(&self) -> Result<HashMap<String, LedgerEntry>> {
        self.read(|conn| {
            let mut out: HashMap<String, LedgerEntry> = HashMap::new();

            let mut stmt = conn.prepare("SELECT id, modified, deleted_at FROM backups")?;
            for record in stmt.query_map([], backup_from_row)? {
                let record = record?;
                let entry = out.entry(record.id.clone()).or_default();
                entry.backup = Some(record);
            }

            let mut stmt = conn.prepare("SELECT id, modified, path FROM syncs")?;
            for record in stmt.query_map([], sync_from_row)? {
                let record = record?;
                let entry = out.entry(record.id.clone()).or_default();
                entry.sync = Some(record);
            }

            let mut stmt = conn.prepare("SELECT id, directory FROM sync_targets")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, directory) = row?;
                out.entry(id).or_default().target = Some(path_from_sql(directory));
            }

            Ok(out)
        })
    }

    fn upsert_backup(&self, id: &str, modified: i64) -> Result<()> {
        self.mutate("upsert_backup", |tx, ctx| {
            let old: Option<i64> = tx
                .query_row("SELECT modified FROM backups WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            tx.execute(
                "INSERT INTO backups (id, modified, deleted_at, updated_at)
                 VALUES (?1, ?2, NULL, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    modified = excluded.modified,
                    deleted_at = NULL,
                    updated_at = excluded.updated_at",
                rusqlite::params![id, modified, now_ms()],
            )?;
            ctx.record_change(
                id,
                EventType::BackupRecorded,
                old.map(|m| m.to_string()),
                Some(modified.to_string()),
            );
            Ok(())
        })
    }

    fn upsert_sync(&self, id: &str, modified: i64, path: &Path) -> Result<()> {
        let path = path_to_sql(path)?;
        self.mutate("upsert_sync", |tx, ctx| {
            let old: Option<String> = tx
                .query_row("SELECT path FROM syncs WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            tx.execute(
                "INSERT INTO syncs (id, modified, path, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    modified = excluded.modified,
                    path = excluded.path,
                    updated_at = excluded.updated_at",
                rusqlite::params![id, modified, path, now_ms()],
            )?;
            ctx.record_change(id, EventType::SyncRecorded, old, Some(path.clone()));
            Ok(())
        })
    }

    fn set_override(&self, id: &str, directory: Option<&Path>) -> Result<()> {
        let directory = directory.map(path_to_sql).transpose()?;
        self.mutate("set_override", |tx, ctx| {
            let old: Option<String> = tx
                .query_row(
                    "SELECT directory FROM sync_targets WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(dir) = &directory {
                tx.execute(
                    "INSERT INTO sync_targets (id, directory, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                        directory = excluded.directory,
                        updated_at = excluded.updated_at",
                    rusqlite::params![id, dir, now_ms()],
                )?;
                ctx.record_change(id, EventType::TargetSet, old, Some(dir.clone()));
            } else {
                tx.execute("DELETE FROM sync_targets WHERE id = ?1", [id])?;
                ctx.record_change(id, EventType::TargetCleared, old, None);
            }
            Ok(())
        })
    }

    fn clear_all_backups(&self) -> Result<usize> {
        self.mutate("clear_all_backups", |tx, ctx| {
            let ids: Vec<String> = tx
                .prepare("SELECT id FROM backups WHERE deleted_at IS NULL")?
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            let now = now_ms();
            tx.execute(
                "UPDATE backups SET deleted_at = ?1, updated_at = ?1 WHERE deleted_at IS NULL",
                [now],
            )?;
            for id in &ids {
                ctx.record_change(id, EventType::BackupInvalidated, None, None);
            }
            Ok(ids.len())
        })
    }

    fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        self.read(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, modified, deleted_at FROM backups ORDER BY id")?;
            let rows = stmt.query_map([], backup_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn list_syncs(&self) -> Result<Vec<SyncRecord>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT id, modified, path FROM syncs ORDER BY id")?;
            let rows = stmt.query_map([], sync_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn history(&self, id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
        self.read(|conn| Ok(get_events(conn, id, limit)?))
    }
}
