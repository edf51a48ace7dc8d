//! Per-item outcomes and run statistics.

use std::path::PathBuf;

use serde::Serialize;

/// What happened to one item during a backup or sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Files mirrored into the backup directory.
    BackedUp { files: usize },
    /// Document written to its sync target.
    Synced { path: PathBuf, bytes: u64 },
    /// The ledger already matches the device.
    UpToDate,
    /// An untracked file occupies the target; nothing was written.
    Conflict { path: PathBuf },
    /// Not applicable (folders in a sync run, no target configured).
    Skipped { reason: String },
    Failed { error: String },
}

/// Outcome of one item, with enough context to report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ItemReport {
    #[must_use]
    pub fn new(id: &str, name: &str, outcome: Outcome) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            outcome,
        }
    }
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub transferred: usize,
    pub up_to_date: usize,
    pub conflicts: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunStats {
    #[must_use]
    pub fn from_reports(reports: &[ItemReport]) -> Self {
        let mut stats = Self::default();
        for report in reports {
            match report.outcome {
                Outcome::BackedUp { .. } | Outcome::Synced { .. } => stats.transferred += 1,
                Outcome::UpToDate => stats.up_to_date += 1,
                Outcome::Conflict { .. } => stats.conflicts += 1,
                Outcome::Skipped { .. } => stats.skipped += 1,
                Outcome::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.transferred + self.up_to_date + self.conflicts + self.skipped + self.failed
    }

    /// True when every item either transferred or was already current.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.conflicts == 0 && self.failed == 0
    }
}
