//! History command implementation.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{format_ms, open_ledger};
use crate::error::Result;
use crate::storage::{Event, Ledger};

#[derive(Serialize)]
struct HistoryOutput<'a> {
    id: &'a str,
    events: &'a [Event],
}

/// Execute history command.
pub fn execute(id: &str, limit: u32, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let ledger = open_ledger(db_path)?;
    let events = ledger.history(id, Some(limit))?;

    if json {
        let output = HistoryOutput {
            id,
            events: &events,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No history for {id}.");
        return Ok(());
    }

    for event in &events {
        let change = match (&event.old_value, &event.new_value) {
            (Some(old), Some(new)) if old != new => format!("{old} -> {new}"),
            (_, Some(new)) => new.clone(),
            (Some(old), None) => format!("was {old}"),
            (None, None) => String::new(),
        };
        println!(
            "{}  {:<20} {}",
            format_ms(event.created_at).dimmed(),
            event.event_type.as_str(),
            change
        );
    }
    Ok(())
}
