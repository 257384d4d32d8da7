use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Apply LOOM_EDIT blocks to a workspace, validate them, and roll back breaking edits.")]
pub(crate) struct Cli {
    /// Workspace root (default: current directory).
    #[arg(long, short = 'w', global = true)]
    pub(crate) workspace: Option<PathBuf>,

    /// Override the user config directory holding `settings.yaml`.
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging on stderr (ignored when RUST_LOG is set).
    #[arg(long, short = 'v', global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Apply every LOOM_EDIT block from stdin (or --input), validating each.
    Apply {
        /// Read edit blocks from this file instead of stdin.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Print outcomes as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate one file without editing it.
    Validate {
        /// Workspace-relative or absolute path.
        path: String,

        /// Print the validation result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Undo an action by id (or unique prefix); the newest one by default.
    Undo {
        id: Option<String>,
    },
    /// Show the undo history, oldest first.
    History {
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON schema of a shared type, or list the available types.
    Schema {
        type_name: Option<String>,
    },
}
