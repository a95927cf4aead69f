//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::GroupPath;

/// Tree-mutation engine for nested boolean query builders
#[derive(Parser, Debug)]
#[command(name = "qbtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding the local .qbtree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    /// Compact JSON output
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a query tree
    Show {
        /// Query tree (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Print JSON instead of the tree view
        #[arg(long)]
        json: bool,
    },

    /// Check a query tree against the configured registries
    Validate {
        /// Query tree (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Apply a gesture script, one emission per gesture
    Apply {
        /// Query tree (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// JSON array of gestures
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        gestures: PathBuf,
        /// Write the resulting tree here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// List the group updates of every emission
        #[arg(long)]
        updates: bool,
    },

    /// Relocate one child to another group
    Move {
        /// Query tree (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Source group path, e.g. /0/3
        from: GroupPath,
        /// Child index in the source group
        from_index: usize,
        /// Destination group path, as seen before the move
        to: GroupPath,
        /// Index in the destination group after the removal
        to_index: usize,
        /// Write the resulting tree here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Replay a recorded log of drag notifications
    Replay {
        /// Query tree (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// JSON array of cycles, each an array of notifications
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        log: PathBuf,
        /// Write the resulting tree here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Create config file from template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
