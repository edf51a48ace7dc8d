//! Backup and sync of device items to local directories.
//!
//! - **Backup** mirrors an item's raw files from the device's document store
//!   into the backup directory, keyed by item id.
//! - **Sync** downloads rendered documents through the data channel into a
//!   folder tree that mirrors the device's folders.
//!
//! Both consult the ledger to skip unchanged items and record each transfer
//! after it completes.

mod engine;
pub mod file;
mod types;

pub use engine::{EngineSettings, SyncEngine};
pub use file::atomic_write;
pub use types::{ItemReport, Outcome, RunStats};
