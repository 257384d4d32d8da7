//! Undo store errors.

use std::path::PathBuf;

use loom_io::IoError;
use thiserror::Error;

/// Errors from [`crate::UndoStore`].
#[derive(Error, Debug)]
pub enum UndoError {
    /// No action with this id (or id prefix).
    #[error("undo action not found: {0}")]
    NotFound(String),

    /// Id prefix matches more than one action.
    #[error("ambiguous undo id: {0}")]
    Ambiguous(String),

    /// Action was recorded but its edit never landed.
    #[error("action {0} was never applied")]
    NotApplied(String),

    /// Action was already undone.
    #[error("action {0} was already undone")]
    AlreadyUndone(String),

    /// Nothing left to undo.
    #[error("no applied actions to undo")]
    Empty,

    /// Backup file for an edit is gone.
    #[error("backup missing: {}", .0.display())]
    BackupMissing(PathBuf),

    /// Atomic write failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Filesystem operation failed.
    #[error("{op} {}: {source}", .path.display())]
    Fs {
        /// Operation name.
        op: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// `history.json` could not be parsed.
    #[error("corrupt history {}: {source}", .path.display())]
    Corrupt {
        /// History file path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// History could not be serialized.
    #[error("serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl UndoError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            op,
            path: path.into(),
            source,
        }
    }
}
