//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// rmsync - Backup, sync and stroke extraction for reMarkable tablets
#[derive(Parser, Debug)]
#[command(name = "rmsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Ledger database path (default: ~/.rmsync/data/ledger.db)
    #[arg(long, global = true, env = "RMSYNC_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,

    /// Show device connection status
    Status,

    /// List device items with backup and sync hints
    List {
        /// Include trashed items
        #[arg(long)]
        all: bool,
    },

    /// Mirror raw item files into the backup directory
    Backup {
        /// Items to back up (folders include everything below them)
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Back up every item that changed since its last backup
        #[arg(long)]
        all: bool,
    },

    /// Download rendered documents into the sync directory
    Sync {
        /// Items to sync (folders include everything below them)
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Sync every document that needs it
        #[arg(long)]
        all: bool,
    },

    /// Per-item sync target overrides
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },

    /// Show the ledger history of an item
    History {
        /// Item ID
        id: String,

        /// Maximum number of events
        #[arg(long, short = 'n', default_value = "20")]
        limit: u32,
    },

    /// Decode local .lines page files
    Decode {
        /// Page files to decode
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a notebook's strokes as handwriting recognition input
    Strokes {
        /// Notebook ID
        id: String,

        /// Language code passed to the recognizer (default: from config)
        #[arg(long)]
        language: Option<String>,
    },

    /// Upload a PDF or EPUB to the device
    Upload {
        /// File to upload
        file: PathBuf,

        /// Destination folder ID (default: top level)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Target Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TargetCommands {
    /// Sync an item into DIR instead of its place under the sync directory
    Set {
        /// Item ID
        id: String,

        /// Target directory
        dir: PathBuf,
    },

    /// Remove an item's target override
    Clear {
        /// Item ID
        id: String,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Set a configuration value (an empty value clears optional settings)
    Set {
        /// Setting name (host, user, ssh-key, ssh-port, remote-root,
        /// local-root, web-url, backup-dir, sync-dir, connect-timeout,
        /// language)
        key: String,

        /// New value
        value: String,
    },

    /// Print the config file location
    Path,
}
