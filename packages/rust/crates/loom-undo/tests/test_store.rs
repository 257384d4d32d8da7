//! Tests for UndoStore persistence and restore.

use std::fs;

use loom_undo::{BACKUP_DIR, HISTORY_FILE, UndoError, UndoKind, UndoStore};
use tempfile::TempDir;

fn backups(store: &UndoStore) -> usize {
    fs::read_dir(store.dir().join(BACKUP_DIR)).unwrap().count()
}

#[test]
fn test_edit_then_undo_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("win.txt");
    let original = b"one\r\ntwo\r\n\xff raw\r\n".to_vec();
    fs::write(&file, &original).unwrap();

    let mut store = UndoStore::open(dir.path().join(".loom/undo"), 50).unwrap();
    let id = store.record_edit(&file, "REPLACE 2 win.txt").unwrap().id;
    fs::write(&file, "changed\n").unwrap();
    store.mark_applied(&id).unwrap();

    let undone = store.undo(&id).unwrap();
    assert!(undone.undone);
    assert!(undone.undone_at.is_some());
    assert_eq!(fs::read(&file).unwrap(), original);
}

#[test]
fn test_undo_twice_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let id = store.record_edit(&file, "edit").unwrap().id;
    store.mark_applied(&id).unwrap();
    store.undo(&id).unwrap();

    assert!(matches!(store.undo(&id), Err(UndoError::AlreadyUndone(_))));
}

#[test]
fn test_unapplied_action_cannot_be_undone() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let id = store.record_edit(&file, "edit").unwrap().id;
    assert!(matches!(store.undo(&id), Err(UndoError::NotApplied(_))));
}

#[test]
fn test_undo_create_removes_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("new.rs");

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let id = store.record_create(&file, "CREATE new.rs").unwrap().id;
    fs::write(&file, "fn main() {}\n").unwrap();
    store.mark_applied(&id).unwrap();

    let undone = store.undo_last().unwrap();
    assert_eq!(undone.kind, UndoKind::FileCreate);
    assert!(!file.exists());
}

#[test]
fn test_undo_delete_restores_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("gone.txt");
    fs::write(&file, "keep me\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let id = store.record_delete(&file, "delete gone.txt").unwrap().id;
    fs::remove_file(&file).unwrap();
    store.mark_applied(&id).unwrap();

    store.undo(&id).unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "keep me\n");
}

#[test]
fn test_undo_last_skips_undone_and_pending() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "v1\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let first = store.record_edit(&file, "first").unwrap().id;
    fs::write(&file, "v2\n").unwrap();
    store.mark_applied(&first).unwrap();

    let second = store.record_edit(&file, "second").unwrap().id;
    fs::write(&file, "v3\n").unwrap();
    store.mark_applied(&second).unwrap();

    let _pending = store.record_edit(&file, "pending").unwrap().id;

    assert_eq!(store.undo_last().unwrap().id, second);
    assert_eq!(fs::read_to_string(&file).unwrap(), "v2\n");
    assert_eq!(store.undo_last().unwrap().id, first);
    assert_eq!(fs::read_to_string(&file).unwrap(), "v1\n");
    assert!(matches!(store.undo_last(), Err(UndoError::Empty)));
}

#[test]
fn test_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let undo_dir = dir.path().join("undo");
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let id = {
        let mut store = UndoStore::open(&undo_dir, 50).unwrap();
        let id = store.record_edit(&file, "REPLACE 1 a.txt").unwrap().id;
        store.mark_applied(&id).unwrap();
        id
    };
    assert!(undo_dir.join(HISTORY_FILE).exists());

    let mut store = UndoStore::open(&undo_dir, 50).unwrap();
    assert_eq!(store.len(), 1);
    let action = store.get(&id).unwrap();
    assert!(action.applied);
    assert_eq!(action.description, "REPLACE 1 a.txt");

    fs::write(&file, "b\n").unwrap();
    store.undo(&id).unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "a\n");
}

#[test]
fn test_eviction_removes_backups() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 3).unwrap();
    let first = store.record_edit(&file, "e1").unwrap().id;
    for n in 2..=5 {
        store.record_edit(&file, &format!("e{n}")).unwrap();
    }

    assert_eq!(store.len(), 3);
    assert_eq!(backups(&store), 3);
    assert!(matches!(store.get(&first), Err(UndoError::NotFound(_))));
    assert_eq!(store.history()[0].description, "e3");
}

#[test]
fn test_discard_drops_action_and_backup() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let id = store.record_edit(&file, "failed edit").unwrap().id;
    assert_eq!(backups(&store), 1);

    store.discard(&id).unwrap();
    assert!(store.is_empty());
    assert_eq!(backups(&store), 0);
}

#[test]
fn test_missing_backup_reported() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let id = store.record_edit(&file, "edit").unwrap().id;
    store.mark_applied(&id).unwrap();
    let backup = store.backup_file(store.get(&id).unwrap()).unwrap();
    fs::remove_file(backup).unwrap();

    assert!(matches!(store.undo(&id), Err(UndoError::BackupMissing(_))));
}

#[test]
fn test_record_returns_pending_action() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "a\n").unwrap();

    let mut store = UndoStore::open(dir.path().join("undo"), 50).unwrap();
    let action = store.record_edit(&file, "REPLACE 1 a.txt").unwrap();

    assert_eq!(action.kind, UndoKind::FileEdit);
    assert_eq!(action.path, file);
    assert_eq!(action.description, "REPLACE 1 a.txt");
    assert!(!action.applied && !action.undone);
    let backup = store.backup_file(&action).unwrap();
    assert_eq!(fs::read(backup).unwrap(), b"a\n");
    assert_eq!(store.get(&action.id).unwrap(), &action);
}
