//! Ledger storage.
//!
//! The ledger remembers, per remote item, the last modification that was
//! backed up or synced and any explicit sync target. Hints are derived by
//! comparing it with a fresh device listing.
//!
//! # Submodules
//!
//! - [`events`] - Ledger history
//! - [`ledger`] - The `Ledger` trait, record types and the in-memory backend
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - SQLite backend

pub mod events;
pub mod ledger;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use events::{Event, EventType};
pub use ledger::{BackupRecord, Ledger, LedgerEntry, MemoryLedger, SyncRecord};
pub use sqlite::SqliteLedger;
