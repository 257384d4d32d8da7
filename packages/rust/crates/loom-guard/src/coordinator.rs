//! Apply, validate, and compensate.
//!
//! Every edit is recorded in the undo store before the file is touched.
//! After the write the engine validates the edited region; critical errors
//! undo the action and produce a rollback report. The store lock is released
//! before validation so slow language servers never block history access.

use std::path::{Path, PathBuf};

use loom_edit::{
    EditAction, EditCommand, EditConfig, PatchApplier, parse_all, resolve_in_workspace,
    verify_file_hash,
};
use loom_io::read_text_strict;
use loom_types::{Diagnostic, LineRegion, ValidationResult};
use loom_undo::{UndoAction, UndoStore};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::GuardConfig;
use crate::engine::ValidationEngine;
use crate::error::GuardError;
use crate::report::{ReportContext, rollback_report, verification_report};

/// Final state of an applied edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    /// The edit stays on disk.
    Verified,
    /// Critical errors were found and the file was restored.
    RolledBack,
}

/// Result of [`RollbackCoordinator::apply_and_verify`].
#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    /// Verified or rolled back.
    pub status: EditStatus,
    /// Resolved target path.
    pub path: PathBuf,
    /// Command summary, e.g. `REPLACE 2-4 src/lib.rs`.
    pub command: String,
    /// Edit action.
    pub action: EditAction,
    /// Affected lines in the edited text.
    pub region: LineRegion,
    /// Whether the edit created the file.
    pub created: bool,
    /// Undo action recorded for the edit.
    pub undo_id: String,
    /// Region-scoped validation of the edited file.
    pub validation: ValidationResult,
    /// Errors matching a critical pattern. They caused the rollback when
    /// `rollback_on_error` is set and are only reported otherwise.
    pub critical: Vec<Diagnostic>,
    /// Human-readable report.
    pub report: String,
}

impl EditOutcome {
    /// Whether the edit was undone.
    #[must_use]
    pub fn is_rolled_back(&self) -> bool {
        self.status == EditStatus::RolledBack
    }
}

/// Runs the apply → validate → rollback pipeline for one workspace.
pub struct RollbackCoordinator {
    workspace_root: PathBuf,
    config: GuardConfig,
    edit_config: EditConfig,
    engine: ValidationEngine,
    undo: Mutex<UndoStore>,
}

impl RollbackCoordinator {
    /// Coordinator for `workspace_root` (expected absolute).
    #[must_use]
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        config: GuardConfig,
        engine: ValidationEngine,
        undo: UndoStore,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            config,
            edit_config: EditConfig::default(),
            engine,
            undo: Mutex::new(undo),
        }
    }

    /// Workspace root edits are confined to.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Active policy.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// The validation engine.
    #[must_use]
    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// Error diagnostics that match a critical pattern or heuristic.
    #[must_use]
    pub fn critical_errors<'a>(&self, result: &'a ValidationResult) -> Vec<&'a Diagnostic> {
        result
            .errors
            .iter()
            .filter(|d| self.config.is_critical_message(&d.message))
            .collect()
    }

    /// Whether `result` warrants undoing the edit.
    #[must_use]
    pub fn should_rollback(&self, result: &ValidationResult) -> bool {
        self.config.rollback_on_error && !self.critical_errors(result).is_empty()
    }

    /// Apply one command, validate the edited region, and undo it when
    /// validation finds critical errors.
    ///
    /// # Errors
    /// Workspace, hash, range, search and I/O failures abort before or
    /// during the write, leaving the file and history unchanged. Undo
    /// failures during a rollback are returned as `Undo`.
    pub async fn apply_and_verify(&self, cmd: &EditCommand) -> Result<EditOutcome, GuardError> {
        let path = resolve_in_workspace(&self.workspace_root, &cmd.path)?;
        if self.config.verify_file_hash && cmd.file_hash.is_some() && path.exists() {
            let current = read_text_strict(&path, self.edit_config.max_file_size)?;
            verify_file_hash(cmd, &current)?;
        }

        let description = cmd.describe();
        let (undo_id, outcome) = {
            let mut store = self.undo.lock().await;
            let undo_id = if path.exists() {
                store.record_edit(&path, &description)?.id
            } else {
                store.record_create(&path, &description)?.id
            };
            let outcome = match PatchApplier::apply(&path, cmd, &self.edit_config) {
                Ok(outcome) => outcome,
                Err(err) => {
                    if let Err(discard_err) = store.discard(&undo_id) {
                        tracing::warn!(
                            event = "loom.guard.apply.discard_failed",
                            id = %undo_id,
                            error = %discard_err,
                            "could not discard undo action"
                        );
                    }
                    tracing::warn!(
                        event = "loom.guard.apply.failed",
                        command = %description,
                        error = %err,
                        "edit not applied"
                    );
                    return Err(err.into());
                }
            };
            store.mark_applied(&undo_id)?;
            (undo_id, outcome)
        };

        let validation = self
            .engine
            .validate_region(&path, Some(outcome.region))
            .await;
        let critical: Vec<Diagnostic> =
            self.critical_errors(&validation).into_iter().cloned().collect();
        let roll_back = self.config.rollback_on_error && !critical.is_empty();

        let display = self.display_path(&path);
        let ctx = ReportContext {
            path: &display,
            command: cmd,
            region: outcome.region,
            original: outcome.original.as_deref(),
            modified: &outcome.modified,
            validation: &validation,
            critical: &critical,
            undo_id: &undo_id,
            buffer: self.config.context_buffer_lines,
        };

        let (status, report) = if roll_back {
            self.undo.lock().await.undo(&undo_id)?;
            tracing::warn!(
                event = "loom.guard.rollback",
                command = %description,
                validator = %validation.validator_used,
                critical = critical.len(),
                undo_id = %undo_id,
                "edit rolled back"
            );
            (EditStatus::RolledBack, rollback_report(&ctx))
        } else {
            tracing::info!(
                event = "loom.guard.verified",
                command = %description,
                validator = %validation.validator_used,
                errors = validation.errors.len(),
                critical = critical.len(),
                warnings = validation.warnings.len(),
                "edit verified"
            );
            (EditStatus::Verified, verification_report(&ctx))
        };

        Ok(EditOutcome {
            status,
            path,
            command: description,
            action: cmd.action(),
            region: outcome.region,
            created: outcome.created,
            undo_id,
            validation,
            critical,
            report,
        })
    }

    /// Parse every block in `text` and run each through
    /// [`Self::apply_and_verify`] in order. Blocks are independent: a failed
    /// block does not stop the ones after it.
    pub async fn apply_all(&self, text: &str) -> Vec<Result<EditOutcome, GuardError>> {
        let mut results = Vec::new();
        for parsed in parse_all(text) {
            let result = match parsed {
                Ok(cmd) => self.apply_and_verify(&cmd).await,
                Err(err) => Err(err.into()),
            };
            results.push(result);
        }
        results
    }

    /// Validate a workspace file without editing it.
    ///
    /// # Errors
    /// `Edit(OutsideWorkspace)` for paths escaping the root.
    pub async fn validate(&self, path: &str) -> Result<ValidationResult, GuardError> {
        let path = resolve_in_workspace(&self.workspace_root, path)?;
        Ok(self.engine.validate(&path).await)
    }

    /// Undo one action by id or unique id prefix.
    ///
    /// # Errors
    /// See [`UndoStore::undo`].
    pub async fn undo(&self, id: &str) -> Result<UndoAction, GuardError> {
        Ok(self.undo.lock().await.undo(id)?)
    }

    /// Undo the newest undoable action.
    ///
    /// # Errors
    /// See [`UndoStore::undo_last`].
    pub async fn undo_last(&self) -> Result<UndoAction, GuardError> {
        Ok(self.undo.lock().await.undo_last()?)
    }

    /// Snapshot of the undo history, oldest first.
    pub async fn history(&self) -> Vec<UndoAction> {
        self.undo.lock().await.history().to_vec()
    }

    /// Stop every language server.
    pub async fn shutdown(&self) {
        if let Some(lsp) = self.engine.lsp() {
            lsp.shutdown_all().await;
        }
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.workspace_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
