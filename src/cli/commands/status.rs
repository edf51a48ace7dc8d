//! Status command implementation.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{open_engine, runtime};
use crate::device::{ConnectionError, ConnectionStatus, DeviceType, JobKind};
use crate::error::Result;
use crate::storage::Ledger;

#[derive(Serialize)]
struct StatusOutput {
    connected: bool,
    device: Option<DeviceType>,
    resolution: Option<(u32, u32)>,
    error: Option<ConnectionError>,
    jobs: JobsOutput,
    backup_dir: Option<PathBuf>,
    sync_dir: Option<PathBuf>,
    backups: usize,
    syncs: usize,
}

#[derive(Serialize)]
struct JobsOutput {
    backup: bool,
    sync: bool,
    recognition: bool,
    templates: bool,
}

impl JobsOutput {
    fn from_status(status: &ConnectionStatus) -> Self {
        Self {
            backup: status.permits(JobKind::Backup),
            sync: status.permits(JobKind::Sync),
            recognition: status.permits(JobKind::Recognition),
            templates: status.permits(JobKind::Templates),
        }
    }
}

/// Execute status command.
///
/// Connection failures are reported, not returned as errors.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (engine, config) = open_engine(db_path)?;
    let status = runtime()?.block_on(engine.status());
    let backups = engine
        .ledger()
        .list_backups()?
        .iter()
        .filter(|b| !b.is_deleted())
        .count();
    let syncs = engine.ledger().list_syncs()?.len();

    let output = StatusOutput {
        connected: status.is_connected(),
        device: status.device,
        resolution: status.device.map(DeviceType::resolution),
        error: status.error.clone(),
        jobs: JobsOutput::from_status(&status),
        backup_dir: config.backup_dir,
        sync_dir: config.sync_dir,
        backups,
        syncs,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let headline = if status.is_connected() {
        "connected".green().bold()
    } else if status.control_reachable() {
        "degraded".yellow().bold()
    } else {
        "unreachable".red().bold()
    };
    println!("Device:  {headline}");
    if let Some(device) = output.device {
        let (w, h) = device.resolution();
        println!("Model:   {device} ({w}x{h})");
    }
    if let Some(error) = &output.error {
        println!("Problem: {error}");
    }
    println!();

    let yes_no = |ok: bool| if ok { "yes".green() } else { "no".red() };
    println!("Backup:      {}", yes_no(output.jobs.backup));
    println!("Sync:        {}", yes_no(output.jobs.sync));
    println!("Recognition: {}", yes_no(output.jobs.recognition));
    println!();

    let dir = |d: &Option<PathBuf>| {
        d.as_ref()
            .map_or_else(|| "(not set)".dimmed().to_string(), |p| p.display().to_string())
    };
    println!("Backup dir: {}", dir(&output.backup_dir));
    println!("Sync dir:   {}", dir(&output.sync_dir));
    println!("Ledger:     {backups} backups, {syncs} syncs");

    Ok(())
}
