//! Undo history store with JSON persistence.
//!
//! The store is single-writer; callers that share it across tasks wrap it
//! in a mutex. History is rewritten atomically after every mutation.

use std::fs;
use std::path::{Path, PathBuf};

use loom_io::{atomic_write_bytes, atomic_write_text};
use serde::{Deserialize, Serialize};

use crate::action::{UndoAction, UndoKind};
use crate::error::UndoError;

/// History file name inside the store directory.
pub const HISTORY_FILE: &str = "history.json";
/// Backup directory name inside the store directory.
pub const BACKUP_DIR: &str = "backups";
/// Default number of actions kept before the oldest are evicted.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

const HISTORY_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct HistorySnapshot {
    version: u32,
    actions: Vec<UndoAction>,
}

/// Persistent, bounded undo history.
#[derive(Debug)]
pub struct UndoStore {
    dir: PathBuf,
    max_entries: usize,
    actions: Vec<UndoAction>,
}

impl UndoStore {
    /// Open (or initialize) the store at `dir`.
    ///
    /// # Errors
    /// Fails when the directory cannot be created or `history.json` exists
    /// but does not parse.
    pub fn open(dir: impl Into<PathBuf>, max_entries: usize) -> Result<Self, UndoError> {
        let dir = dir.into();
        let backups = dir.join(BACKUP_DIR);
        fs::create_dir_all(&backups).map_err(|e| UndoError::fs("create", &backups, e))?;

        let history_path = dir.join(HISTORY_FILE);
        let actions = match fs::read_to_string(&history_path) {
            Ok(raw) => {
                let snapshot: HistorySnapshot =
                    serde_json::from_str(&raw).map_err(|source| UndoError::Corrupt {
                        path: history_path.clone(),
                        source,
                    })?;
                snapshot.actions
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(UndoError::fs("read", &history_path, e)),
        };

        tracing::debug!(
            event = "loom.undo.store.opened",
            dir = %dir.display(),
            actions = actions.len(),
            max_entries,
            "undo store opened"
        );

        Ok(Self {
            dir,
            max_entries: max_entries.max(1),
            actions,
        })
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All actions, oldest first.
    #[must_use]
    pub fn history(&self) -> &[UndoAction] {
        &self.actions
    }

    /// Look up an action by id or unique id prefix.
    ///
    /// # Errors
    /// `NotFound` or `Ambiguous`.
    pub fn get(&self, id: &str) -> Result<&UndoAction, UndoError> {
        self.position(id).map(|idx| &self.actions[idx])
    }

    /// Absolute path of an action's backup file.
    #[must_use]
    pub fn backup_file(&self, action: &UndoAction) -> Option<PathBuf> {
        action.backup_path.as_ref().map(|rel| self.dir.join(rel))
    }

    /// Record an edit of an existing file, copying its current bytes to a
    /// backup. Returns the new action, which starts unapplied.
    ///
    /// # Errors
    /// Fails when the file cannot be read or the backup cannot be written.
    pub fn record_edit(
        &mut self,
        path: &Path,
        description: &str,
    ) -> Result<UndoAction, UndoError> {
        self.record_with_backup(UndoKind::FileEdit, path, description)
    }

    /// Record a deletion, backing up the file first.
    ///
    /// # Errors
    /// Fails when the file cannot be read or the backup cannot be written.
    pub fn record_delete(
        &mut self,
        path: &Path,
        description: &str,
    ) -> Result<UndoAction, UndoError> {
        self.record_with_backup(UndoKind::FileDelete, path, description)
    }

    /// Record the creation of a file that does not exist yet.
    ///
    /// # Errors
    /// Fails when the history cannot be persisted.
    pub fn record_create(
        &mut self,
        path: &Path,
        description: &str,
    ) -> Result<UndoAction, UndoError> {
        let action = new_action(UndoKind::FileCreate, path, description, None);
        self.push(action)
    }

    /// Mark an action's edit as landed.
    ///
    /// # Errors
    /// `NotFound` for unknown ids; persistence failures.
    pub fn mark_applied(&mut self, id: &str) -> Result<(), UndoError> {
        let idx = self.position(id)?;
        let action = &mut self.actions[idx];
        action.applied = true;
        action.applied_at = Some(now_millis());
        self.persist()
    }

    /// Drop an action whose edit never landed, deleting its backup.
    ///
    /// # Errors
    /// `NotFound` for unknown ids; persistence failures.
    pub fn discard(&mut self, id: &str) -> Result<(), UndoError> {
        let idx = self.position(id)?;
        let action = self.actions.remove(idx);
        self.remove_backup(&action);
        tracing::debug!(
            event = "loom.undo.store.discarded",
            id = %action.id,
            "undo action discarded"
        );
        self.persist()
    }

    /// Revert one action: restore the backup bytes, or remove a file the
    /// action created. The backup is kept so history stays inspectable.
    ///
    /// # Errors
    /// `NotApplied`, `AlreadyUndone`, `BackupMissing` or filesystem failures.
    pub fn undo(&mut self, id: &str) -> Result<UndoAction, UndoError> {
        let idx = self.position(id)?;
        let action = self.actions[idx].clone();
        if action.undone {
            return Err(UndoError::AlreadyUndone(action.id));
        }
        if !action.applied {
            return Err(UndoError::NotApplied(action.id));
        }

        match action.kind {
            UndoKind::FileEdit | UndoKind::FileDelete => {
                let backup = self
                    .backup_file(&action)
                    .ok_or_else(|| UndoError::BackupMissing(action.path.clone()))?;
                let bytes = fs::read(&backup).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        UndoError::BackupMissing(backup.clone())
                    } else {
                        UndoError::fs("read", &backup, e)
                    }
                })?;
                atomic_write_bytes(&action.path, &bytes)?;
            }
            UndoKind::FileCreate => match fs::remove_file(&action.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(
                        event = "loom.undo.store.create_missing",
                        path = %action.path.display(),
                        "created file already gone"
                    );
                }
                Err(e) => return Err(UndoError::fs("remove", &action.path, e)),
            },
        }

        let entry = &mut self.actions[idx];
        entry.undone = true;
        entry.undone_at = Some(now_millis());
        let undone = entry.clone();
        self.persist()?;

        tracing::info!(
            event = "loom.undo.store.undone",
            id = %undone.id,
            kind = %undone.kind,
            path = %undone.path.display(),
            "action undone"
        );
        Ok(undone)
    }

    /// Undo the most recent applied, not-yet-undone action.
    ///
    /// # Errors
    /// `Empty` when nothing is undoable; otherwise as [`Self::undo`].
    pub fn undo_last(&mut self) -> Result<UndoAction, UndoError> {
        let id = self
            .actions
            .iter()
            .rev()
            .find(|action| action.is_undoable())
            .map(|action| action.id.clone())
            .ok_or(UndoError::Empty)?;
        self.undo(&id)
    }

    fn record_with_backup(
        &mut self,
        kind: UndoKind,
        path: &Path,
        description: &str,
    ) -> Result<UndoAction, UndoError> {
        let bytes = fs::read(path).map_err(|e| UndoError::fs("read", path, e))?;
        let id = uuid::Uuid::new_v4().to_string();
        let rel = PathBuf::from(BACKUP_DIR).join(format!("{}-{id}.bak", now_millis()));
        atomic_write_bytes(self.dir.join(&rel), &bytes)?;

        let mut action = new_action(kind, path, description, Some(rel));
        action.id = id;
        self.push(action)
    }

    fn push(&mut self, action: UndoAction) -> Result<UndoAction, UndoError> {
        let recorded = action.clone();
        tracing::debug!(
            event = "loom.undo.store.recorded",
            id = %action.id,
            kind = %action.kind,
            path = %action.path.display(),
            "undo action recorded"
        );
        self.actions.push(action);
        self.evict();
        self.persist()?;
        Ok(recorded)
    }

    fn evict(&mut self) {
        if self.actions.len() <= self.max_entries {
            return;
        }
        let excess = self.actions.len() - self.max_entries;
        let evicted: Vec<UndoAction> = self.actions.drain(..excess).collect();
        for action in &evicted {
            self.remove_backup(action);
        }
        tracing::debug!(
            event = "loom.undo.store.evicted",
            count = evicted.len(),
            "oldest undo actions evicted"
        );
    }

    fn remove_backup(&self, action: &UndoAction) {
        if let Some(backup) = self.backup_file(action)
            && let Err(e) = fs::remove_file(&backup)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                event = "loom.undo.store.backup_remove_failed",
                path = %backup.display(),
                error = %e,
                "failed to remove backup"
            );
        }
    }

    fn position(&self, id: &str) -> Result<usize, UndoError> {
        if let Some(idx) = self.actions.iter().position(|a| a.id == id) {
            return Ok(idx);
        }
        let mut matches = self
            .actions
            .iter()
            .enumerate()
            .filter(|(_, a)| !id.is_empty() && a.id.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some((idx, _)), None) => Ok(idx),
            (Some(_), Some(_)) => Err(UndoError::Ambiguous(id.to_string())),
            (None, _) => Err(UndoError::NotFound(id.to_string())),
        }
    }

    fn persist(&self) -> Result<(), UndoError> {
        let snapshot = HistorySnapshot {
            version: HISTORY_VERSION,
            actions: self.actions.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        atomic_write_text(self.dir.join(HISTORY_FILE), &json)?;
        Ok(())
    }
}

fn new_action(
    kind: UndoKind,
    path: &Path,
    description: &str,
    backup_path: Option<PathBuf>,
) -> UndoAction {
    UndoAction {
        id: uuid::Uuid::new_v4().to_string(),
        kind,
        path: path.to_path_buf(),
        backup_path,
        description: description.to_string(),
        created_at: now_millis(),
        applied_at: None,
        undone_at: None,
        applied: false,
        undone: false,
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefix_lookup() {
        let dir = TempDir::new().unwrap();
        let mut store = UndoStore::open(dir.path().join("undo"), 10).unwrap();
        let id = store
            .record_create(&dir.path().join("a.txt"), "CREATE a.txt")
            .unwrap()
            .id;
        assert_eq!(store.get(&id[..8]).unwrap().id, id);
        assert!(matches!(store.get("zzzz"), Err(UndoError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_history_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(HISTORY_FILE), "{not json").unwrap();
        assert!(matches!(
            UndoStore::open(dir.path(), 10),
            Err(UndoError::Corrupt { .. })
        ));
    }
}
