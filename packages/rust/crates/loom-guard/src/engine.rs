//! Picks a validator for a file and scopes its diagnostics to an edit.
//!
//! The language server is asked first. Its answer is kept when a server
//! actually checked the file within the window; otherwise the fallback
//! checkers get a turn. Parser-style checkers judge the whole document, so
//! their errors are kept wherever they land. When neither applies the degraded LSP result (or a
//! `none` result) says the file was not checked, and it counts as valid.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use loom_io::{DEFAULT_MAX_FILE_BYTES, read_text_safe};
use loom_lsp::{LspManager, detect_language};
use loom_types::{LineRegion, ValidationResult, ValidatorKind};

use crate::config::DEFAULT_CONTEXT_BUFFER_LINES;
use crate::fallback::{FallbackChecker, default_checkers};

/// LSP-first validator with in-process fallbacks.
pub struct ValidationEngine {
    lsp: Option<Arc<LspManager>>,
    checkers: Vec<Box<dyn FallbackChecker>>,
    region_buffer: usize,
}

impl ValidationEngine {
    /// Engine using `lsp` when given, and the default checkers when
    /// `fallback_enabled`.
    #[must_use]
    pub fn new(lsp: Option<Arc<LspManager>>, fallback_enabled: bool) -> Self {
        Self {
            lsp,
            checkers: if fallback_enabled {
                default_checkers()
            } else {
                Vec::new()
            },
            region_buffer: DEFAULT_CONTEXT_BUFFER_LINES,
        }
    }

    /// Lines kept on each side of a region when filtering.
    #[must_use]
    pub fn with_region_buffer(mut self, lines: usize) -> Self {
        self.region_buffer = lines;
        self
    }

    /// Add a fallback checker.
    #[must_use]
    pub fn with_checker(mut self, checker: Box<dyn FallbackChecker>) -> Self {
        self.checkers.push(checker);
        self
    }

    /// The language server registry, if any.
    #[must_use]
    pub fn lsp(&self) -> Option<&Arc<LspManager>> {
        self.lsp.as_ref()
    }

    /// Validate the whole file.
    pub async fn validate(&self, path: &Path) -> ValidationResult {
        self.validate_region(path, None).await
    }

    /// Validate `path`, keeping only diagnostics near `region` when given.
    pub async fn validate_region(&self, path: &Path, region: Option<LineRegion>) -> ValidationResult {
        let started = Instant::now();

        let lsp_result = match &self.lsp {
            Some(lsp) => Some(lsp.validate_file(path).await),
            None => None,
        };
        let lsp_result = match lsp_result {
            Some(result) if result.validator_used == ValidatorKind::Lsp && !result.timed_out => {
                return self.scope(result, region);
            }
            other => other,
        };

        if let Some((result, whole_document)) = self.run_fallback(path) {
            let result = result.with_elapsed(started.elapsed());
            return if whole_document {
                result
            } else {
                self.scope(result, region)
            };
        }

        let result = lsp_result.unwrap_or_else(|| {
            ValidationResult::valid(ValidatorKind::None, detect_language(path))
                .with_elapsed(started.elapsed())
        });
        tracing::debug!(
            event = "loom.guard.validate.unchecked",
            path = %path.display(),
            validator = %result.validator_used,
            timed_out = result.timed_out,
            "no validator checked the file"
        );
        result
    }

    /// The checker's result, and whether it must skip region filtering.
    fn run_fallback(&self, path: &Path) -> Option<(ValidationResult, bool)> {
        let language = detect_language(path)?;
        let checker = self.checkers.iter().find(|c| c.applies_to(language))?;
        let text = match read_text_safe(path, DEFAULT_MAX_FILE_BYTES) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    event = "loom.guard.fallback.read_failed",
                    path = %path.display(),
                    error = %err,
                    "fallback checker skipped"
                );
                return None;
            }
        };
        let diagnostics = checker.check(&text);
        tracing::debug!(
            event = "loom.guard.fallback.checked",
            path = %path.display(),
            checker = checker.name(),
            diagnostics = diagnostics.len(),
            "fallback check done"
        );
        let result =
            ValidationResult::from_diagnostics(diagnostics, ValidatorKind::Fallback, Some(language))
                .with_server(checker.name());
        Some((result, checker.whole_document()))
    }

    fn scope(&self, result: ValidationResult, region: Option<LineRegion>) -> ValidationResult {
        match region {
            Some(region) => result.filter_to_region(region, self.region_buffer),
            None => result,
        }
    }
}
