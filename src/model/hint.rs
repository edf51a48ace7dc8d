//! Staleness and conflict hints.

use bitflags::bitflags;
use serde::{Serialize, Serializer};

bitflags! {
    /// Derived state of one item relative to the ledger and the filesystem.
    ///
    /// A single item carries at most one flag per hint kind; unions appear
    /// when hints are aggregated over a subtree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Hint: u8 {
        /// A sync record exists but the file is gone from the target.
        const NOT_FOUND_IN_TARGET = 1 << 0;
        /// The resolved target path differs from the recorded one.
        const SYNC_PATH_CHANGED = 1 << 1;
        /// The remote item is newer than the recorded copy.
        const MODIFIED = 1 << 2;
        /// Never backed up or synced.
        const NEW = 1 << 3;
        /// An untracked file already occupies the target path.
        const EXISTS_IN_TARGET = 1 << 4;
    }
}

impl Hint {
    pub const NONE: Self = Self::empty();

    /// Short labels for display, one per set flag.
    #[must_use]
    pub fn labels(self) -> Vec<&'static str> {
        self.iter_names()
            .map(|(name, _)| match name {
                "NOT_FOUND_IN_TARGET" => "not-found-in-target",
                "SYNC_PATH_CHANGED" => "sync-path-changed",
                "MODIFIED" => "modified",
                "NEW" => "new",
                "EXISTS_IN_TARGET" => "exists-in-target",
                _ => "unknown",
            })
            .collect()
    }

    /// Whether this hint calls for a transfer.
    #[must_use]
    pub const fn needs_transfer(self) -> bool {
        self.intersects(
            Self::NOT_FOUND_IN_TARGET
                .union(Self::SYNC_PATH_CHANGED)
                .union(Self::MODIFIED)
                .union(Self::NEW),
        )
    }
}

impl Serialize for Hint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.labels())
    }
}
