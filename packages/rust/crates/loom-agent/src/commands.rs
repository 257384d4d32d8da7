//! Command handlers. Each prints to stdout and returns an error for a
//! non-zero exit.

use std::fmt::Write;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use loom_guard::{EditOutcome, GuardError, RollbackCoordinator};
use loom_types::ValidationResult;
use loom_undo::{UndoAction, UndoKind};
use serde_json::json;

pub(crate) async fn run_apply(
    coordinator: &RollbackCoordinator,
    input: Option<PathBuf>,
    json_output: bool,
) -> anyhow::Result<()> {
    let text = read_input(input.as_deref())?;
    let results = coordinator.apply_all(&text).await;
    if results.is_empty() {
        bail!("no LOOM_EDIT blocks found in input");
    }

    let failures = results.iter().filter(|r| r.is_err()).count();
    if json_output {
        let items: Vec<serde_json::Value> = results.iter().map(outcome_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (index, result) in results.iter().enumerate() {
            if index > 0 {
                println!();
            }
            match result {
                Ok(outcome) => print!("{}", outcome.report),
                Err(err) => println!("Edit {} failed: {err}", index + 1),
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} edit blocks failed", results.len());
    }
    Ok(())
}

fn outcome_json(result: &Result<EditOutcome, GuardError>) -> serde_json::Value {
    match result {
        Ok(outcome) => serde_json::to_value(outcome)
            .unwrap_or_else(|err| json!({"status": "error", "error": err.to_string()})),
        Err(err) => json!({"status": "error", "error": err.to_string()}),
    }
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read edit blocks from {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read edit blocks from stdin")?;
            Ok(text)
        }
    }
}

pub(crate) async fn run_validate(
    coordinator: &RollbackCoordinator,
    path: &str,
    json_output: bool,
) -> anyhow::Result<()> {
    let result = coordinator.validate(path).await?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_validation(path, &result));
    }
    if !result.is_valid {
        bail!("{path}: {} error(s)", result.errors.len());
    }
    Ok(())
}

fn render_validation(path: &str, result: &ValidationResult) -> String {
    let verdict = if result.is_valid { "valid" } else { "invalid" };
    let mut out = format!("{path}: {verdict} [{}", result.validator_used);
    if let Some(server) = &result.server {
        let _ = write!(out, " {server}");
    }
    if result.timed_out {
        out.push_str(", timed out");
    }
    let _ = writeln!(out, ", {} ms]", result.elapsed_ms);
    for diagnostic in result.diagnostics() {
        let _ = writeln!(out, "  {diagnostic}");
    }
    out
}

pub(crate) async fn run_undo(
    coordinator: &RollbackCoordinator,
    id: Option<&str>,
) -> anyhow::Result<()> {
    let action = match id {
        Some(id) => coordinator.undo(id).await?,
        None => coordinator.undo_last().await?,
    };
    println!(
        "Undone {} ({}): {}",
        action.id,
        action.kind,
        action.description
    );
    let verb = match action.kind {
        UndoKind::FileCreate => "Removed",
        UndoKind::FileEdit | UndoKind::FileDelete => "Restored",
    };
    println!("{verb} {}", action.path.display());
    Ok(())
}

pub(crate) async fn run_history(
    coordinator: &RollbackCoordinator,
    json_output: bool,
) -> anyhow::Result<()> {
    let history = coordinator.history().await;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("No undo history.");
        return Ok(());
    }
    for action in &history {
        println!("{}", history_line(action));
    }
    Ok(())
}

fn history_line(action: &UndoAction) -> String {
    let short_id: String = action.id.chars().take(8).collect();
    format!(
        "{short_id}  {:<7}  {:<11}  {}  {}",
        action.status(),
        action.kind.as_str(),
        format_millis(action.created_at),
        action.description
    )
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

pub(crate) fn run_schema(type_name: Option<&str>) -> anyhow::Result<()> {
    match type_name {
        Some(name) => {
            let schema = loom_types::get_schema_json(name)
                .with_context(|| format!("no schema for `{name}`"))?;
            println!("{schema}");
        }
        None => {
            for name in loom_types::get_registered_types() {
                println!("{name}");
            }
        }
    }
    Ok(())
}
