//! Ledger schema definitions.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the ledger database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds), matching the
/// device's `lastModified` resolution.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Ledger Tables
-- ====================

-- Backups: last backed-up modification per item
CREATE TABLE IF NOT EXISTS backups (
    id TEXT PRIMARY KEY,
    modified INTEGER NOT NULL,
    deleted_at INTEGER,
    updated_at INTEGER NOT NULL
);

-- Syncs: last synced modification and where it was written
CREATE TABLE IF NOT EXISTS syncs (
    id TEXT PRIMARY KEY,
    modified INTEGER NOT NULL,
    path TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Sync targets: explicit per-item target directory overrides
CREATE TABLE IF NOT EXISTS sync_targets (
    id TEXT PRIMARY KEY,
    directory TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ====================
-- History
-- ====================

CREATE TABLE IF NOT EXISTS ledger_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_events_item ON ledger_events(item_id, created_at);
";

/// Apply pragmas, the base schema and pending migrations.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // In-memory databases report "memory" and ignore WAL
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA_SQL)?;

    super::migrations::run_migrations(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}
