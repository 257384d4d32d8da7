//! End-to-end apply → validate → rollback tests using the fallback checkers.

use std::fs;

use loom_edit::{EditError, ParseError, content_hash, parse};
use loom_guard::{EditStatus, GuardConfig, GuardError, RollbackCoordinator, ValidationEngine};
use loom_types::ValidatorKind;
use loom_undo::UndoStore;
use tempfile::TempDir;

const CONFIG_JSON: &str = "{\n  \"name\": \"loom\",\n  \"version\": 1\n}\n";

fn coordinator_with(dir: &TempDir, config: GuardConfig) -> RollbackCoordinator {
    let store = UndoStore::open(dir.path().join(".loom/undo"), 50).unwrap();
    RollbackCoordinator::new(dir.path(), config, ValidationEngine::new(None, true), store)
}

fn coordinator(dir: &TempDir) -> RollbackCoordinator {
    coordinator_with(dir, GuardConfig::default())
}

fn seed(dir: &TempDir, name: &str, text: &str) {
    fs::write(dir.path().join(name), text).unwrap();
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}

#[tokio::test]
async fn test_breaking_edit_is_rolled_back() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let coord = coordinator(&dir);

    let cmd = parse(">>LOOM_EDIT file=config.json REPLACE 2-2\n  \"name\": \"loom\"\n<<LOOM_EDIT\n")
        .unwrap();
    let outcome = coord.apply_and_verify(&cmd).await.unwrap();

    assert_eq!(outcome.status, EditStatus::RolledBack);
    assert!(outcome.is_rolled_back());
    assert_eq!(outcome.validation.validator_used, ValidatorKind::Fallback);
    assert_eq!(outcome.critical.len(), 1);
    assert_eq!(read(&dir, "config.json"), CONFIG_JSON);
    assert!(outcome.report.starts_with("Edit rolled back: REPLACE 2 config.json"));
    assert!(outcome.report.contains("Critical errors:"));
    assert!(outcome.report.contains("JSON syntax error"));
    assert!(outcome.report.contains("File restored from backup"));

    let history = coord.history().await;
    assert_eq!(history.len(), 1);
    assert!(history[0].applied && history[0].undone);
    assert_eq!(history[0].id, outcome.undo_id);
}

/// `{`, twenty `"kN": N` lines, `}`.
fn long_json() -> String {
    let mut text = String::from("{\n");
    for n in 0..20 {
        let comma = if n < 19 { "," } else { "" };
        text.push_str(&format!("  \"k{n}\": {n}{comma}\n"));
    }
    text.push_str("}\n");
    text
}

#[tokio::test]
async fn test_breaking_edit_deep_in_long_json_is_rolled_back() {
    let dir = TempDir::new().unwrap();
    let original = long_json();
    assert_eq!(original.lines().count(), 22);
    seed(&dir, "wide.json", &original);
    let coord = coordinator(&dir);

    let cmd =
        parse(">>LOOM_EDIT file=wide.json REPLACE 15-15\n  \"k13\" 13,\n<<LOOM_EDIT\n").unwrap();
    let outcome = coord.apply_and_verify(&cmd).await.unwrap();

    assert_eq!(outcome.status, EditStatus::RolledBack);
    assert!(!outcome.validation.is_valid);
    assert_eq!(outcome.critical.len(), 1);
    assert_eq!(fs::read(dir.path().join("wide.json")).unwrap(), original.as_bytes());
}

#[tokio::test]
async fn test_unbalanced_edit_reported_at_eof_is_rolled_back() {
    let dir = TempDir::new().unwrap();
    let original = long_json();
    seed(&dir, "wide.json", &original);
    let coord = coordinator(&dir);

    // The unclosed object only fails at EOF, far below line 2.
    let cmd = parse(
        ">>LOOM_EDIT file=wide.json REPLACE 2-2\n  \"k0\": {\"inner\": 0,\n<<LOOM_EDIT\n",
    )
    .unwrap();
    let outcome = coord.apply_and_verify(&cmd).await.unwrap();

    assert_eq!(outcome.status, EditStatus::RolledBack);
    assert_eq!(read(&dir, "wide.json"), original);
}

#[tokio::test]
async fn test_valid_edit_is_verified_with_report() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let coord = coordinator(&dir);

    let cmd = parse(">>LOOM_EDIT file=config.json REPLACE 3-3\n  \"version\": 2\n<<LOOM_EDIT\n")
        .unwrap();
    let outcome = coord.apply_and_verify(&cmd).await.unwrap();

    assert_eq!(outcome.status, EditStatus::Verified);
    assert!(outcome.validation.is_valid);
    assert_eq!(outcome.validation.server.as_deref(), Some("json"));
    assert_eq!(read(&dir, "config.json"), CONFIG_JSON.replace("1", "2"));

    let report = &outcome.report;
    assert!(report.starts_with("Edit verified: REPLACE 3 config.json"));
    assert!(report.contains("Validator: fallback (json)"));
    assert!(report.contains("Before:\n"));
    assert!(report.contains(">  3 |   \"version\": 1") || report.contains("> 3 |   \"version\": 1"));
    assert!(report.contains("-  \"version\": 1"));
    assert!(report.contains("+  \"version\": 2"));
    assert!(report.contains("Diagnostics: none"));
    assert!(report.contains(&outcome.undo_id));

    let undone = coord.undo(&outcome.undo_id).await.unwrap();
    assert!(undone.undone);
    assert_eq!(read(&dir, "config.json"), CONFIG_JSON);
}

#[tokio::test]
async fn test_rollback_disabled_keeps_broken_edit() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let config = GuardConfig {
        rollback_on_error: false,
        ..GuardConfig::default()
    };
    let coord = coordinator_with(&dir, config);

    let cmd = parse(">>LOOM_EDIT file=config.json DELETE 4-4\n<<LOOM_EDIT\n").unwrap();
    let outcome = coord.apply_and_verify(&cmd).await.unwrap();

    assert_eq!(outcome.status, EditStatus::Verified);
    assert!(!outcome.validation.is_valid);
    assert_eq!(outcome.critical.len(), 1);
    assert_eq!(read(&dir, "config.json"), "{\n  \"name\": \"loom\",\n  \"version\": 1\n");

    let report = &outcome.report;
    assert!(report.starts_with("Edit verified: DELETE 4 config.json"));
    assert!(report.contains("Critical errors (rollback disabled):\n"));
    assert!(report.contains("JSON syntax error"));
    assert!(!report.contains("Diagnostics (non-critical)"));
    assert!(!report.contains("Diagnostics: none"));
}

#[tokio::test]
async fn test_create_then_undo_last_removes_file() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir);

    let cmd = parse(">>LOOM_EDIT file=conf/app.yaml CREATE\nport: 8080\n<<LOOM_EDIT\n").unwrap();
    let outcome = coord.apply_and_verify(&cmd).await.unwrap();
    assert_eq!(outcome.status, EditStatus::Verified);
    assert!(outcome.created);
    assert_eq!(read(&dir, "conf/app.yaml"), "port: 8080\n");
    assert!(outcome.report.contains("(new file)"));

    let undone = coord.undo_last().await.unwrap();
    assert_eq!(undone.id, outcome.undo_id);
    assert!(!dir.path().join("conf/app.yaml").exists());
}

#[tokio::test]
async fn test_failed_apply_leaves_no_history() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let coord = coordinator(&dir);

    let cmd = parse(">>LOOM_EDIT file=config.json REPLACE 7-9\nx\n<<LOOM_EDIT\n").unwrap();
    let err = coord.apply_and_verify(&cmd).await.unwrap_err();
    assert!(matches!(
        err,
        GuardError::Edit(EditError::RangeOutOfBounds { .. })
    ));
    assert!(coord.history().await.is_empty());
    assert_eq!(read(&dir, "config.json"), CONFIG_JSON);

    let missing = parse(">>LOOM_EDIT file=config.json SEARCH_REPLACE \"nope\" \"x\"\n<<LOOM_EDIT\n")
        .unwrap();
    assert!(matches!(
        coord.apply_and_verify(&missing).await,
        Err(GuardError::Edit(EditError::SearchNotFound(_)))
    ));
    assert!(coord.history().await.is_empty());
}

#[tokio::test]
async fn test_create_over_existing_file_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let coord = coordinator(&dir);

    let cmd = parse(">>LOOM_EDIT file=config.json CREATE\n{}\n<<LOOM_EDIT\n").unwrap();
    assert!(matches!(
        coord.apply_and_verify(&cmd).await,
        Err(GuardError::Edit(EditError::AlreadyExists(_)))
    ));
    assert!(coord.history().await.is_empty());
    assert_eq!(read(&dir, "config.json"), CONFIG_JSON);
}

#[tokio::test]
async fn test_path_outside_workspace_is_rejected() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir);

    let cmd = parse(">>LOOM_EDIT file=../escape.txt CREATE\nx\n<<LOOM_EDIT\n").unwrap();
    assert!(matches!(
        coord.apply_and_verify(&cmd).await,
        Err(GuardError::Edit(EditError::OutsideWorkspace(_)))
    ));
    assert!(coord.history().await.is_empty());
}

#[tokio::test]
async fn test_hash_guard_rejects_stale_file() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let config = GuardConfig {
        verify_file_hash: true,
        ..GuardConfig::default()
    };
    let coord = coordinator_with(&dir, config);

    let stale = parse(
        ">>LOOM_EDIT file=config.json v=000000 REPLACE 3-3\n  \"version\": 2\n<<LOOM_EDIT\n",
    )
    .unwrap();
    assert!(matches!(
        coord.apply_and_verify(&stale).await,
        Err(GuardError::Edit(EditError::StaleFile { .. }))
    ));
    assert_eq!(read(&dir, "config.json"), CONFIG_JSON);

    let hash = content_hash(CONFIG_JSON);
    let fresh = parse(&format!(
        ">>LOOM_EDIT file=config.json v={} REPLACE 3-3\n  \"version\": 2\n<<LOOM_EDIT\n",
        &hash[..8]
    ))
    .unwrap();
    let outcome = coord.apply_and_verify(&fresh).await.unwrap();
    assert_eq!(outcome.status, EditStatus::Verified);
}

#[tokio::test]
async fn test_hash_ignored_when_guard_off() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    let coord = coordinator(&dir);

    let cmd = parse(
        ">>LOOM_EDIT file=config.json v=000000 REPLACE 3-3\n  \"version\": 2\n<<LOOM_EDIT\n",
    )
    .unwrap();
    assert!(coord.apply_and_verify(&cmd).await.is_ok());
}

#[tokio::test]
async fn test_apply_all_runs_blocks_independently() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "config.json", CONFIG_JSON);
    seed(&dir, "notes.txt", "one\ntwo\n");
    let coord = coordinator(&dir);

    let response = "\
Here are the changes.

>>LOOM_EDIT file=config.json REPLACE 3-3
  \"version\": 3
<<LOOM_EDIT

>>LOOM_EDIT file=notes.txt FROBNICATE 1
x
<<LOOM_EDIT

>>LOOM_EDIT file=notes.txt INSERT_AFTER 2
three
<<LOOM_EDIT
";
    let results = coord.apply_all(response).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().status, EditStatus::Verified);
    assert!(matches!(
        results[1],
        Err(GuardError::Edit(EditError::Parse(ParseError::UnknownAction(_))))
    ));
    let notes = results[2].as_ref().unwrap();
    assert_eq!(notes.validation.validator_used, ValidatorKind::None);

    assert_eq!(read(&dir, "notes.txt"), "one\ntwo\nthree\n");
    assert!(read(&dir, "config.json").contains("\"version\": 3"));
    assert_eq!(coord.history().await.len(), 2);
}

#[tokio::test]
async fn test_validate_passthrough() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "bad.json", "{");
    let coord = coordinator(&dir);

    let result = coord.validate("bad.json").await.unwrap();
    assert!(!result.is_valid);
    assert!(matches!(
        coord.validate("../bad.json").await,
        Err(GuardError::Edit(EditError::OutsideWorkspace(_)))
    ));
}

#[tokio::test]
async fn test_undo_errors_surface() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir);
    assert!(matches!(coord.undo_last().await, Err(GuardError::Undo(_))));
    assert!(matches!(coord.undo("missing").await, Err(GuardError::Undo(_))));
}
