//! loom CLI: apply agent edit blocks with validation and rollback.
//!
//! Settings come from `~/.config/loom/settings.yaml` (or `--conf <dir>`)
//! overridden by `<workspace>/.loom/settings.yaml`.
//!
//! Logging: `RUST_LOG=loom_guard=debug` (or `--verbose`) for details on stderr.

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use loom_agent::{build_coordinator, load_runtime_settings, set_config_home_override};

use crate::cli::{Cli, Command};
use crate::commands::{run_apply, run_history, run_schema, run_undo, run_validate};

const LOG_TARGETS: [&str; 6] = [
    "loom_agent",
    "loom_guard",
    "loom_lsp",
    "loom_edit",
    "loom_undo",
    "loom_io",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cli.verbose { "debug" } else { "info" };
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect();
        EnvFilter::new(directives.join(","))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Command::Schema { type_name } = &cli.command {
        return run_schema(type_name.as_deref());
    }

    let workspace = match cli.workspace.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("workspace {} not found", workspace.display()))?;
    let settings = load_runtime_settings(&workspace);
    let coordinator = build_coordinator(&workspace, &settings)?;

    let result = match cli.command {
        Command::Apply { input, json } => run_apply(&coordinator, input, json).await,
        Command::Validate { path, json } => run_validate(&coordinator, &path, json).await,
        Command::Undo { id } => run_undo(&coordinator, id.as_deref()).await,
        Command::History { json } => run_history(&coordinator, json).await,
        Command::Schema { .. } => Ok(()),
    };

    coordinator.shutdown().await;
    result
}
