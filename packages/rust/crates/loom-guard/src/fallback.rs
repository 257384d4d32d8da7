//! In-process syntax checkers used when no language server result is usable.

use loom_types::{Diagnostic, Range};
use serde::Deserialize;

/// A whole-document syntax check for one language.
pub trait FallbackChecker: Send + Sync {
    /// Label recorded as the result's `server`.
    fn name(&self) -> &'static str;

    /// Whether this checker handles `language`.
    fn applies_to(&self, language: &str) -> bool;

    /// Diagnostics for `text`; empty when it parses.
    fn check(&self, text: &str) -> Vec<Diagnostic>;

    /// Whether a diagnostic describes the document rather than its line.
    ///
    /// Parsers that stop at the first error may report it far from the
    /// line that caused it, so their results skip region filtering.
    fn whole_document(&self) -> bool {
        false
    }
}

/// `serde_json` parse of the full document. Errors are reported at the
/// document start.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChecker;

impl FallbackChecker for JsonChecker {
    fn name(&self) -> &'static str {
        "json"
    }

    fn applies_to(&self, language: &str) -> bool {
        language == "json"
    }

    fn check(&self, text: &str) -> Vec<Diagnostic> {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(_) => Vec::new(),
            Err(err) => vec![Diagnostic::error(
                Range::point(0, 0),
                format!("JSON syntax error: {err}"),
                Some("json"),
            )],
        }
    }

    fn whole_document(&self) -> bool {
        true
    }
}

/// `serde_yaml` parse of every document in the stream, reporting the first
/// failure at its location.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlChecker;

impl FallbackChecker for YamlChecker {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn applies_to(&self, language: &str) -> bool {
        language == "yaml"
    }

    fn check(&self, text: &str) -> Vec<Diagnostic> {
        for document in serde_yaml::Deserializer::from_str(text) {
            if let Err(err) = serde_yaml::Value::deserialize(document) {
                let (line, character) = err.location().map_or((0, 0), |loc| {
                    (to_u32(loc.line().saturating_sub(1)), to_u32(loc.column().saturating_sub(1)))
                });
                return vec![Diagnostic::error(
                    Range::point(line, character),
                    format!("YAML syntax error: {err}"),
                    Some("yaml"),
                )];
            }
        }
        Vec::new()
    }

    fn whole_document(&self) -> bool {
        true
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Checkers enabled by default.
#[must_use]
pub fn default_checkers() -> Vec<Box<dyn FallbackChecker>> {
    vec![Box::new(JsonChecker), Box::new(YamlChecker)]
}
