//! Rollback policy knobs.

/// Lines of context kept around an edit when filtering diagnostics and
/// rendering reports.
pub const DEFAULT_CONTEXT_BUFFER_LINES: usize = 5;

/// Message fragments that always mark an error as critical.
pub const HEURISTIC_PATTERNS: [&str; 3] = ["unclosed", "unterminated", "expected expression"];

/// Built-in configurable critical patterns.
#[must_use]
pub fn default_critical_patterns() -> Vec<String> {
    ["syntax error", "unexpected token", "parse error", "invalid syntax"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Run in-process checkers when no language server result is usable.
    pub fallback_enabled: bool,
    /// Undo edits that introduce critical errors.
    pub rollback_on_error: bool,
    /// Case-insensitive fragments that make an error critical.
    pub critical_patterns: Vec<String>,
    /// Context lines around the edited region.
    pub context_buffer_lines: usize,
    /// Enforce the `v=` header hash.
    pub verify_file_hash: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            rollback_on_error: true,
            critical_patterns: default_critical_patterns(),
            context_buffer_lines: DEFAULT_CONTEXT_BUFFER_LINES,
            verify_file_hash: false,
        }
    }
}

impl GuardConfig {
    /// Whether an error message matches a configured pattern or heuristic.
    #[must_use]
    pub fn is_critical_message(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.critical_patterns
            .iter()
            .map(|p| p.to_lowercase())
            .any(|p| !p.is_empty() && lower.contains(&p))
            || HEURISTIC_PATTERNS.iter().any(|p| lower.contains(p))
    }
}
