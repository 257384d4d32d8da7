//! Rollback policy tests.

use loom_guard::{GuardConfig, RollbackCoordinator, ValidationEngine};
use loom_types::{Diagnostic, DiagnosticSeverity, Range, ValidationResult, ValidatorKind};
use loom_undo::UndoStore;
use tempfile::TempDir;

fn coordinator(dir: &TempDir, config: GuardConfig) -> RollbackCoordinator {
    let store = UndoStore::open(dir.path().join(".loom/undo"), 50).unwrap();
    RollbackCoordinator::new(dir.path(), config, ValidationEngine::new(None, true), store)
}

fn diagnostic(severity: DiagnosticSeverity, message: &str) -> Diagnostic {
    let mut diag = Diagnostic::error(Range::point(0, 0), message, Some("test"));
    diag.severity = Some(severity);
    diag
}

fn result_with(diags: Vec<Diagnostic>) -> ValidationResult {
    ValidationResult::from_diagnostics(diags, ValidatorKind::Lsp, Some("rust"))
}

#[test]
fn test_configured_pattern_triggers_rollback() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir, GuardConfig::default());
    let result = result_with(vec![diagnostic(
        DiagnosticSeverity::Error,
        "Syntax Error: expected `;`",
    )]);
    assert!(coord.should_rollback(&result));
    assert_eq!(coord.critical_errors(&result).len(), 1);
}

#[test]
fn test_heuristics_trigger_rollback() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir, GuardConfig::default());
    for message in [
        "Unterminated string literal",
        "unclosed delimiter",
        "Expected expression, found `}`",
    ] {
        let result = result_with(vec![diagnostic(DiagnosticSeverity::Error, message)]);
        assert!(coord.should_rollback(&result), "{message}");
    }
}

#[test]
fn test_semantic_errors_do_not_roll_back() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir, GuardConfig::default());
    let result = result_with(vec![diagnostic(
        DiagnosticSeverity::Error,
        "cannot find value `x` in this scope",
    )]);
    assert!(!result.is_valid);
    assert!(!coord.should_rollback(&result));
}

#[test]
fn test_warnings_never_roll_back() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir, GuardConfig::default());
    let result = result_with(vec![
        diagnostic(DiagnosticSeverity::Warning, "possible syntax error"),
        diagnostic(DiagnosticSeverity::Hint, "unclosed region"),
    ]);
    assert!(!coord.should_rollback(&result));
}

#[test]
fn test_missing_severity_counts_as_error() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir, GuardConfig::default());
    let mut diag = diagnostic(DiagnosticSeverity::Error, "parse error near `fn`");
    diag.severity = None;
    assert!(coord.should_rollback(&result_with(vec![diag])));
}

#[test]
fn test_rollback_switch_off() {
    let dir = TempDir::new().unwrap();
    let config = GuardConfig {
        rollback_on_error: false,
        ..GuardConfig::default()
    };
    let coord = coordinator(&dir, config);
    let result = result_with(vec![diagnostic(DiagnosticSeverity::Error, "syntax error")]);
    assert!(!coord.should_rollback(&result));
}

#[test]
fn test_custom_patterns() {
    let dir = TempDir::new().unwrap();
    let config = GuardConfig {
        critical_patterns: vec!["E0308".to_string()],
        ..GuardConfig::default()
    };
    let coord = coordinator(&dir, config);

    let custom = result_with(vec![diagnostic(DiagnosticSeverity::Error, "mismatched types [e0308]")]);
    assert!(coord.should_rollback(&custom));

    let default_only = result_with(vec![diagnostic(DiagnosticSeverity::Error, "syntax error")]);
    assert!(!coord.should_rollback(&default_only));
}

#[test]
fn test_clean_result_is_kept() {
    let dir = TempDir::new().unwrap();
    let coord = coordinator(&dir, GuardConfig::default());
    assert!(!coord.should_rollback(&ValidationResult::valid(ValidatorKind::None, None)));
}
