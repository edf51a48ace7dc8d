//! Target command implementations.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::open_ledger;
use crate::cli::TargetCommands;
use crate::error::Result;
use crate::storage::Ledger;

#[derive(Serialize)]
struct TargetOutput<'a> {
    id: &'a str,
    directory: Option<&'a Path>,
}

/// Execute target commands.
///
/// Overrides only touch the ledger; the device is not contacted.
pub fn execute(command: &TargetCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let ledger = open_ledger(db_path)?;

    let (id, directory) = match command {
        TargetCommands::Set { id, dir } => (id, Some(std::path::absolute(dir)?)),
        TargetCommands::Clear { id } => (id, None),
    };
    ledger.set_override(id, directory.as_deref())?;

    if json {
        let output = TargetOutput {
            id,
            directory: directory.as_deref(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if let Some(dir) = &directory {
        println!("{id} will sync into {}", dir.display());
    } else {
        println!("Cleared target override for {id}");
    }
    Ok(())
}
