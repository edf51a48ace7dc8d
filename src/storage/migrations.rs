//! Ledger migrations.
//!
//! The base DDL in `schema.rs` always describes the latest layout; these
//! migrations bring databases created by older releases forward. Each one
//! is recorded in `schema_migrations` and applied at most once.

use rusqlite::{Connection, Result};
use tracing::{info, warn};

/// A single migration with version identifier and SQL content.
struct Migration {
    version: &'static str,
    sql: &'static str,
}

/// All migrations in order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001_backup_deleted_marker",
        sql: "ALTER TABLE backups ADD COLUMN deleted_at INTEGER;",
    },
    Migration {
        version: "002_sync_target_timestamps",
        sql: "ALTER TABLE sync_targets ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0;",
    },
    Migration {
        version: "003_sync_path_index",
        sql: "CREATE INDEX IF NOT EXISTS idx_syncs_path ON syncs(path);",
    },
];

/// Run all pending migrations on the database.
///
/// Idempotent and safe to call on every open. `ALTER TABLE` failures for
/// columns that the base schema already created are logged and the
/// migration is marked complete.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: std::collections::HashSet<String> = conn
        .prepare("SELECT version FROM schema_migrations")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for migration in MIGRATIONS {
        if applied.contains(migration.version) {
            continue;
        }

        info!(version = migration.version, "Applying migration");

        if let Err(e) = conn.execute_batch(migration.sql) {
            if e.to_string().contains("duplicate column name") {
                warn!(
                    version = migration.version,
                    "Migration partially applied (columns exist), marking complete"
                );
            } else {
                return Err(e);
            }
        }

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::SCHEMA_SQL;

    fn applied_count(conn: &Connection) -> i32 {
        conn.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version LIKE '0%'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_run_migrations_on_fresh_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        run_migrations(&conn).expect("Migrations should apply to fresh database");
        assert_eq!(applied_count(&conn), 3);
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(applied_count(&conn), 3);
    }

    #[test]
    fn test_upgrades_legacy_backups_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE backups (id TEXT PRIMARY KEY, modified INTEGER NOT NULL, updated_at INTEGER NOT NULL);
             CREATE TABLE syncs (id TEXT PRIMARY KEY, modified INTEGER NOT NULL, path TEXT NOT NULL, updated_at INTEGER NOT NULL);
             CREATE TABLE sync_targets (id TEXT PRIMARY KEY, directory TEXT NOT NULL);",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO backups (id, modified, deleted_at, updated_at) VALUES ('a', 1, 5, 1)",
            [],
        )
        .expect("deleted_at column should exist after migration");
        conn.execute(
            "INSERT INTO sync_targets (id, directory) VALUES ('a', '/tmp')",
            [],
        )
        .expect("updated_at should default");
    }
}
