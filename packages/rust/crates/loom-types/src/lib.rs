//! loom-types - Common type definitions for Loom
//!
//! Shared data structures used by the edit, validation and rollback crates.
//! Diagnostics mirror the LSP wire shape exactly so language-server payloads
//! deserialize straight into them.
//!
//! # Schema Singularity
//! Types derive `schemars::JsonSchema` so external consumers (agent prompts,
//! UIs) can retrieve authoritative schemas for the results they receive.

#![allow(clippy::doc_markdown)]

use std::fmt;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Zero-based position in a text document (LSP `Position`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    /// Zero-based line.
    pub line: u32,
    /// Zero-based column (UTF-16 code units on the LSP wire).
    pub character: u32,
}

/// Zero-based, end-exclusive range (LSP `Range`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Range {
    /// Range start.
    pub start: Position,
    /// Range end.
    pub end: Position,
}

impl Range {
    /// Range covering a single point.
    #[must_use]
    pub fn point(line: u32, character: u32) -> Self {
        let pos = Position { line, character };
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// LSP diagnostic severity (1=error .. 4=hint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DiagnosticSeverity {
    /// Reports an error.
    Error,
    /// Reports a warning.
    Warning,
    /// Reports an information.
    Information,
    /// Reports a hint.
    Hint,
}

impl From<u8> for DiagnosticSeverity {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Error,
            2 => Self::Warning,
            3 => Self::Information,
            _ => Self::Hint,
        }
    }
}

impl From<DiagnosticSeverity> for u8 {
    fn from(value: DiagnosticSeverity) -> Self {
        match value {
            DiagnosticSeverity::Error => 1,
            DiagnosticSeverity::Warning => 2,
            DiagnosticSeverity::Information => 3,
            DiagnosticSeverity::Hint => 4,
        }
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        };
        f.write_str(label)
    }
}

/// One issue reported by a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    /// Location of the issue.
    pub range: Range,
    /// Severity; servers may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<u8>")]
    pub severity: Option<DiagnosticSeverity>,
    /// Diagnostic code (number or string on the wire).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
    /// Producer label, e.g. `rustc` or `json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Error diagnostic at `range`.
    #[must_use]
    pub fn error(range: Range, message: impl Into<String>, source: Option<&str>) -> Self {
        Self {
            range,
            severity: Some(DiagnosticSeverity::Error),
            code: None,
            source: source.map(str::to_string),
            message: message.into(),
        }
    }

    /// Effective severity. A missing severity is treated as an error.
    #[must_use]
    pub fn effective_severity(&self) -> DiagnosticSeverity {
        self.severity.unwrap_or(DiagnosticSeverity::Error)
    }

    /// One-based line the diagnostic starts on, for human display.
    #[must_use]
    pub fn display_line(&self) -> u32 {
        self.range.start.line + 1
    }

    /// Whether the diagnostic touches the zero-based line interval `[lo, hi]`.
    #[must_use]
    pub fn overlaps_lines(&self, lo: u32, hi: u32) -> bool {
        self.range.start.line <= hi && self.range.end.line >= lo
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L{}:{} [{}] {}",
            self.display_line(),
            self.range.start.character + 1,
            self.effective_severity(),
            self.message
        )?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

/// Which validator produced a [`ValidationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// A language server produced the diagnostics.
    Lsp,
    /// An in-process fallback checker produced the diagnostics.
    Fallback,
    /// Validation is switched off by configuration.
    Disabled,
    /// A validator is configured but could not be started.
    Unavailable,
    /// No validator exists for the file's language.
    Unsupported,
    /// Nothing applied; the file is assumed valid.
    None,
}

impl ValidatorKind {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lsp => "lsp",
            Self::Fallback => "fallback",
            Self::Disabled => "disabled",
            Self::Unavailable => "unavailable",
            Self::Unsupported => "unsupported",
            Self::None => "none",
        }
    }

    /// Whether this kind means a real check ran.
    #[must_use]
    pub fn is_checked(self) -> bool {
        matches!(self, Self::Lsp | Self::Fallback)
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-based, inclusive line interval of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LineRegion {
    /// First line (1-based).
    pub start: usize,
    /// Last line (1-based, inclusive).
    pub end: usize,
}

impl LineRegion {
    /// Build a region, clamping so that `end >= start >= 1`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        let start = start.max(1);
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Zero-based inclusive line bounds widened by `buffer` lines.
    #[must_use]
    pub fn widened_zero_based(&self, buffer: usize) -> (u32, u32) {
        let lo = self.start.saturating_sub(1).saturating_sub(buffer);
        let hi = self.end.saturating_sub(1).saturating_add(buffer);
        (
            u32::try_from(lo).unwrap_or(u32::MAX),
            u32::try_from(hi).unwrap_or(u32::MAX),
        )
    }
}

impl fmt::Display for LineRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Outcome of checking one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    /// True when no error diagnostics remain.
    pub is_valid: bool,
    /// Error diagnostics (severity 1 or missing).
    pub errors: Vec<Diagnostic>,
    /// Warning diagnostics (severity 2).
    pub warnings: Vec<Diagnostic>,
    /// Information and hint diagnostics (severity 3 and 4).
    pub hints: Vec<Diagnostic>,
    /// Detected language id, if any.
    pub language: Option<String>,
    /// Wall-clock time spent validating.
    pub elapsed_ms: u64,
    /// Validator identity.
    pub validator_used: ValidatorKind,
    /// Server command or checker name that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// The diagnostics window expired before the validator answered.
    #[serde(default)]
    pub timed_out: bool,
}

impl ValidationResult {
    /// A valid result with no diagnostics.
    #[must_use]
    pub fn valid(validator_used: ValidatorKind, language: Option<&str>) -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            hints: Vec::new(),
            language: language.map(str::to_string),
            elapsed_ms: 0,
            validator_used,
            server: None,
            timed_out: false,
        }
    }

    /// Bucket diagnostics by severity.
    #[must_use]
    pub fn from_diagnostics(
        diagnostics: Vec<Diagnostic>,
        validator_used: ValidatorKind,
        language: Option<&str>,
    ) -> Self {
        let mut result = Self::valid(validator_used, language);
        for diagnostic in diagnostics {
            match diagnostic.effective_severity() {
                DiagnosticSeverity::Error => result.errors.push(diagnostic),
                DiagnosticSeverity::Warning => result.warnings.push(diagnostic),
                DiagnosticSeverity::Information | DiagnosticSeverity::Hint => {
                    result.hints.push(diagnostic);
                }
            }
        }
        result.is_valid = result.errors.is_empty();
        result
    }

    /// Attach the producing server or checker name.
    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Record elapsed validation time.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Keep only diagnostics within `buffer` lines of `region`.
    #[must_use]
    pub fn filter_to_region(mut self, region: LineRegion, buffer: usize) -> Self {
        let (lo, hi) = region.widened_zero_based(buffer);
        let keep = |d: &Diagnostic| d.overlaps_lines(lo, hi);
        self.errors.retain(keep);
        self.warnings.retain(keep);
        self.hints.retain(keep);
        self.is_valid = self.errors.is_empty();
        self
    }

    /// Every diagnostic, errors first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.hints.iter())
    }

    /// Total number of diagnostics.
    #[must_use]
    pub fn diagnostic_count(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.hints.len()
    }
}

// =============================================================================
// Schema Registry: Dynamic JSON Schema Generation for external consumers
// =============================================================================

/// Schema generation error
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Requested type is not registered.
    #[error("Unknown type: {0}")]
    UnknownType(String),
}

/// Get JSON Schema for a registered type.
///
/// # Errors
/// Returns `SchemaError::UnknownType` if the type name is not registered.
pub fn get_schema_json(type_name: &str) -> Result<String, SchemaError> {
    let schema = match type_name {
        "Diagnostic" => schemars::schema_for!(Diagnostic),
        "Range" => schemars::schema_for!(Range),
        "ValidationResult" => schemars::schema_for!(ValidationResult),
        "LineRegion" => schemars::schema_for!(LineRegion),
        _ => return Err(SchemaError::UnknownType(type_name.to_string())),
    };
    serde_json::to_string_pretty(&schema)
        .map_err(|e| SchemaError::UnknownType(format!("Serialization failed: {e}")))
}

/// Get list of all registered type names.
#[must_use]
pub fn get_registered_types() -> Vec<&'static str> {
    vec!["Diagnostic", "Range", "ValidationResult", "LineRegion"]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(line: u32, severity: u8, message: &str) -> Diagnostic {
        Diagnostic {
            range: Range::point(line, 0),
            severity: Some(DiagnosticSeverity::from(severity)),
            code: None,
            source: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_diagnostic_wire_shape() {
        let raw = r#"{"range":{"start":{"line":2,"character":4},"end":{"line":2,"character":9}},"severity":1,"message":"expected `;`","source":"rustc","code":"E0001"}"#;
        let parsed: Diagnostic = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.severity, Some(DiagnosticSeverity::Error));
        assert_eq!(parsed.range.start.character, 4);

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["severity"], 1);
        assert_eq!(out["range"]["end"]["character"], 9);
    }

    #[test]
    fn test_missing_severity_counts_as_error() {
        let raw = r#"{"range":{"start":{"line":0,"character":0},"end":{"line":0,"character":1}},"message":"boom"}"#;
        let parsed: Diagnostic = serde_json::from_str(raw).unwrap();
        let result =
            ValidationResult::from_diagnostics(vec![parsed], ValidatorKind::Lsp, Some("rust"));
        assert_eq!(result.errors.len(), 1);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_bucketing() {
        let result = ValidationResult::from_diagnostics(
            vec![diag(0, 1, "e"), diag(1, 2, "w"), diag(2, 3, "i"), diag(3, 4, "h")],
            ValidatorKind::Lsp,
            None,
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.hints.len(), 2);
        assert_eq!(result.diagnostic_count(), 4);
    }

    #[test]
    fn test_filter_to_region_excludes_far_diagnostics() {
        // Region is lines 20-22 (1-based); buffer 5 keeps zero-based 14..=26.
        let result = ValidationResult::from_diagnostics(
            vec![
                diag(13, 1, "far above"),
                diag(14, 1, "edge"),
                diag(26, 2, "edge below"),
                diag(27, 1, "far below"),
            ],
            ValidatorKind::Lsp,
            None,
        )
        .filter_to_region(LineRegion::new(20, 22), 5);

        let messages: Vec<_> = result.diagnostics().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["edge", "edge below"]);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_filter_recomputes_validity() {
        let result =
            ValidationResult::from_diagnostics(vec![diag(100, 1, "old")], ValidatorKind::Lsp, None)
                .filter_to_region(LineRegion::new(1, 1), 5);
        assert!(result.is_valid);
    }

    #[test]
    fn test_schema_registry() {
        for name in get_registered_types() {
            assert!(get_schema_json(name).is_ok(), "schema for {name}");
        }
        assert!(get_schema_json("Nope").is_err());
    }
}
