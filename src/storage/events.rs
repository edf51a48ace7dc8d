//! Ledger history.
//!
//! Every ledger mutation appends an event in the same transaction, so the
//! history of an item shows when it was backed up, synced or retargeted.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// Event types for ledger history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BackupRecorded,
    BackupInvalidated,
    SyncRecorded,
    TargetSet,
    TargetCleared,
}

impl EventType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BackupRecorded => "backup_recorded",
            Self::BackupInvalidated => "backup_invalidated",
            Self::SyncRecorded => "sync_recorded",
            Self::TargetSet => "target_set",
            Self::TargetCleared => "target_cleared",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "backup_recorded" => Some(Self::BackupRecorded),
            "backup_invalidated" => Some(Self::BackupInvalidated),
            "sync_recorded" => Some(Self::SyncRecorded),
            "target_set" => Some(Self::TargetSet),
            "target_cleared" => Some(Self::TargetCleared),
            _ => None,
        }
    }
}

/// A ledger history record.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub item_id: String,
    pub event_type: EventType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(item_id: &str, event_type: EventType) -> Self {
        Self {
            id: 0,
            item_id: item_id.to_string(),
            event_type,
            old_value: None,
            new_value: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }
}

/// Insert an event into the database.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO ledger_events (item_id, event_type, old_value, new_value, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            event.item_id,
            event.event_type.as_str(),
            event.old_value,
            event.new_value,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get the most recent events for an item, newest first.
pub fn get_events(conn: &Connection, item_id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
    let limit = limit.unwrap_or(100);
    let mut stmt = conn.prepare(
        "SELECT id, item_id, event_type, old_value, new_value, created_at
         FROM ledger_events
         WHERE item_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(rusqlite::params![item_id, limit], |row| {
        let raw: String = row.get(2)?;
        let event_type = EventType::parse(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown event type {raw}").into(),
            )
        })?;
        Ok(Event {
            id: row.get(0)?,
            item_id: row.get(1)?,
            event_type,
            old_value: row.get(3)?,
            new_value: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_event_insert_and_get() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let first = Event::new("doc-1", EventType::BackupRecorded)
            .with_values(None, Some("1000".to_string()));
        let second = Event::new("doc-1", EventType::SyncRecorded);
        insert_event(&conn, &first).unwrap();
        let id = insert_event(&conn, &second).unwrap();
        assert!(id > 0);
        insert_event(&conn, &Event::new("other", EventType::TargetSet)).unwrap();

        let events = get_events(&conn, "doc-1", Some(10)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::SyncRecorded);
        assert_eq!(events[1].new_value.as_deref(), Some("1000"));
    }
}
