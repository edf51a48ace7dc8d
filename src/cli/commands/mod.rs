//! Command implementations.

pub mod completions;
pub mod config;
pub mod decode;
pub mod history;
pub mod list;
pub mod status;
pub mod strokes;
pub mod target;
pub mod transfer;
pub mod upload;
pub mod version;

use std::path::PathBuf;

use crate::config::{load_config, resolve_db_path, Config};
use crate::device::{DeviceConnector, UsbWebTransport};
use crate::error::{Error, Result};
use crate::storage::SqliteLedger;
use crate::sync::SyncEngine;

/// Engine wired to the configured device and the on-disk ledger.
pub type Engine = SyncEngine<DeviceConnector, UsbWebTransport, SqliteLedger>;

/// Runtime for the async device operations.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

pub(crate) fn open_ledger(db_path: Option<&PathBuf>) -> Result<SqliteLedger> {
    let path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine database path".into()))?;
    SqliteLedger::open(&path)
}

pub(crate) fn open_engine(db_path: Option<&PathBuf>) -> Result<(Engine, Config)> {
    let config = load_config()?;
    let engine = SyncEngine::new(
        config.control_channel(),
        config.data_channel()?,
        open_ledger(db_path)?,
        config.engine_settings(),
    );
    Ok((engine, config))
}

/// Format a millisecond timestamp for display.
pub(crate) fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}
