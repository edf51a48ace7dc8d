//! Config command implementations.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::open_ledger;
use crate::cli::ConfigCommands;
use crate::config::{config_path, load_config, load_config_from, save_config_to, Config};
use crate::error::Result;
use crate::storage::Ledger;

#[derive(Serialize)]
struct SetOutput<'a> {
    key: &'a str,
    value: &'a str,
    invalidated_backups: usize,
}

/// Execute config commands.
pub fn execute(command: &ConfigCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(json),
        ConfigCommands::Set { key, value } => set(key, value, db_path, json),
        ConfigCommands::Path => {
            let path = config_path()?;
            if json {
                println!("{}", serde_json::json!({ "path": path }));
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

fn show(json: bool) -> Result<()> {
    let config = load_config()?;
    if json {
        println!("{}", serde_json::to_string(&config)?);
        return Ok(());
    }
    print_entries(&config);
    Ok(())
}

fn print_entries(config: &Config) {
    for (key, value) in config.entries() {
        if value.is_empty() {
            println!("{key:<16} {}", "(not set)".dimmed());
        } else {
            println!("{key:<16} {value}");
        }
    }
}

/// Write one value to the config file.
///
/// Environment overrides are not persisted. Moving the effective backup
/// directory invalidates every backup record so the next run copies
/// everything again; a change hidden by `RMSYNC_BACKUP_DIR` moves nothing.
fn set(key: &str, value: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let path = config_path()?;
    let mut config = load_config_from(&path)?;
    let before = config.clone().with_env().backup_dir;
    let change = config.set(key, value)?;
    save_config_to(&path, &config)?;

    let moved = change.backup_dir_changed && config.clone().with_env().backup_dir != before;
    let invalidated_backups = if moved {
        open_ledger(db_path)?.clear_all_backups()?
    } else {
        0
    };

    if json {
        let output = SetOutput {
            key,
            value,
            invalidated_backups,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Set {key}");
    if invalidated_backups > 0 {
        println!(
            "{}",
            format!("{invalidated_backups} backup records invalidated; the next backup copies everything.")
                .dimmed()
        );
    }
    Ok(())
}
