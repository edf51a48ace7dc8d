//! Backup and sync command implementations.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{open_engine, runtime, Engine};
use crate::device::JobKind;
use crate::error::Result;
use crate::sync::{ItemReport, Outcome, RunStats};

#[derive(Serialize)]
struct RunOutput<'a> {
    job: &'a str,
    items: &'a [ItemReport],
    stats: RunStats,
}

/// Execute backup command.
pub fn execute_backup(db_path: Option<&PathBuf>, ids: &[String], all: bool, json: bool) -> Result<()> {
    run(db_path, JobKind::Backup, ids, all, json)
}

/// Execute sync command.
pub fn execute_sync(db_path: Option<&PathBuf>, ids: &[String], all: bool, json: bool) -> Result<()> {
    run(db_path, JobKind::Sync, ids, all, json)
}

fn run(db_path: Option<&PathBuf>, job: JobKind, ids: &[String], all: bool, json: bool) -> Result<()> {
    let (engine, _config) = open_engine(db_path)?;
    let reports = runtime()?.block_on(collect(&engine, job, ids, all))?;
    let stats = RunStats::from_reports(&reports);

    if json {
        let output = RunOutput {
            job: job_name(job),
            items: &reports,
            stats,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    for report in &reports {
        print_report(report);
    }
    if !reports.is_empty() {
        println!();
    }
    println!(
        "{}: {} transferred, {} up to date, {} conflicts, {} skipped, {} failed",
        job_name(job),
        stats.transferred,
        stats.up_to_date,
        stats.conflicts,
        stats.skipped,
        stats.failed
    );
    if stats.conflicts > 0 {
        println!(
            "{}",
            "Conflicting files were left untouched; move them or use `rmsync target set`."
                .dimmed()
        );
    }
    Ok(())
}

async fn collect(engine: &Engine, job: JobKind, ids: &[String], all: bool) -> Result<Vec<ItemReport>> {
    engine.ensure_permitted(job).await?;

    if all {
        return match job {
            JobKind::Sync => engine.sync_all().await,
            _ => engine.backup_all().await,
        };
    }

    let mut reports = Vec::new();
    for id in ids {
        let batch = match job {
            JobKind::Sync => engine.sync(id).await?,
            _ => engine.backup(id).await?,
        };
        reports.extend(batch);
    }
    Ok(reports)
}

const fn job_name(job: JobKind) -> &'static str {
    match job {
        JobKind::Sync => "sync",
        _ => "backup",
    }
}

fn print_report(report: &ItemReport) {
    let status = match &report.outcome {
        Outcome::BackedUp { files } => format!("backed up ({files} files)").green(),
        Outcome::Synced { path, .. } => format!("synced -> {}", path.display()).green(),
        Outcome::UpToDate => "up to date".dimmed(),
        Outcome::Conflict { path } => format!("conflict at {}", path.display()).red(),
        Outcome::Skipped { reason } => format!("skipped: {reason}").dimmed(),
        Outcome::Failed { error } => format!("failed: {error}").red().bold(),
    };
    println!("{}  {}  {status}", report.name, report.id.dimmed());
}
