//! List command implementation.

use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::path::PathBuf;

use super::{format_ms, open_engine, runtime};
use crate::error::Result;
use crate::model::Hint;
use crate::tree::Node;

#[derive(Serialize)]
struct ListEntry<'a> {
    depth: usize,
    #[serde(flatten)]
    node: &'a Node,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    items: Vec<ListEntry<'a>>,
    count: usize,
}

/// Execute list command.
///
/// Live items print as an indented tree; with `all`, trashed items follow.
pub fn execute(db_path: Option<&PathBuf>, all: bool, json: bool) -> Result<()> {
    let (engine, _config) = open_engine(db_path)?;
    let tree = runtime()?.block_on(engine.refresh())?;

    let mut entries: Vec<ListEntry<'_>> = tree
        .walk()
        .into_iter()
        .map(|(depth, node)| ListEntry { depth, node })
        .collect();
    let live = entries.len();
    if all {
        entries.extend(
            tree.nodes()
                .filter(|n| n.item.trashed)
                .map(|node| ListEntry { depth: 0, node }),
        );
    }

    if json {
        let output = ListOutput {
            count: entries.len(),
            items: entries,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No items on the device.");
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        if i == live {
            println!();
            println!("{}", "Trash".dimmed().bold());
        }
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &ListEntry<'_>) {
    let item = &entry.node.item;
    let indent = "  ".repeat(entry.depth);
    let name = if item.is_collection {
        format!("{}/", item.name).blue().bold()
    } else {
        item.name.normal()
    };

    let mut tags: Vec<String> = Vec::new();
    if !item.is_collection {
        tags.extend(
            hint_tags("backup", entry.node.backup_hint)
                .into_iter()
                .chain(hint_tags("sync", entry.node.sync_hint))
                .map(|t| t.to_string()),
        );
    } else if entry.node.combined_hint != Hint::NONE {
        tags.push("changes below".yellow().to_string());
    }

    println!(
        "{indent}{name}  {}  {}{}",
        item.id.dimmed(),
        format_ms(item.modified).dimmed(),
        if tags.is_empty() {
            String::new()
        } else {
            format!("  {}", tags.join(" "))
        }
    );
}

fn hint_tags(kind: &str, hint: Hint) -> Vec<ColoredString> {
    hint.labels()
        .into_iter()
        .map(|label| {
            let tag = format!("[{kind}:{label}]");
            if label == "exists-in-target" {
                tag.red()
            } else if label == "new" {
                tag.green()
            } else {
                tag.yellow()
            }
        })
        .collect()
}
