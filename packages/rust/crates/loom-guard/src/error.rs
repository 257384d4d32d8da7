//! Coordinator errors.

use loom_edit::{EditError, ParseError};
use loom_io::IoError;
use loom_undo::UndoError;
use thiserror::Error;

/// Failures of the apply/validate/rollback pipeline.
///
/// Validation itself never fails; these cover the edit and undo steps.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Parse, range, search, hash or workspace failure.
    #[error(transparent)]
    Edit(#[from] EditError),
    /// Backup or history failure.
    #[error(transparent)]
    Undo(#[from] UndoError),
    /// File read failure outside the applier.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<ParseError> for GuardError {
    fn from(err: ParseError) -> Self {
        Self::Edit(EditError::Parse(err))
    }
}
