//! Plain-text reports handed back to the agent after each edit.

use std::fmt::Write;

use loom_edit::{EditCommand, generate_file_diff};
use loom_io::NormalizedText;
use loom_types::{Diagnostic, LineRegion, ValidationResult};

/// Everything a report needs about one applied edit.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// Workspace-relative path for display.
    pub path: &'a str,
    /// The command that was applied.
    pub command: &'a EditCommand,
    /// Affected lines in the modified text.
    pub region: LineRegion,
    /// Text before the edit; `None` for created files.
    pub original: Option<&'a str>,
    /// Text after the edit.
    pub modified: &'a str,
    /// Region-scoped validation of the modified file.
    pub validation: &'a ValidationResult,
    /// Errors matching a critical pattern.
    pub critical: &'a [Diagnostic],
    /// Undo action recorded for the edit.
    pub undo_id: &'a str,
    /// Context lines around the region.
    pub buffer: usize,
}

/// Numbered lines of `text` around `region`; region lines are marked `>`.
#[must_use]
pub fn numbered_context(text: &str, region: LineRegion, buffer: usize) -> String {
    let doc = NormalizedText::new(text);
    let lines = doc.lines();
    if lines.is_empty() {
        return "  (empty file)\n".to_string();
    }

    let first = region.start.saturating_sub(buffer).max(1);
    let last = region.end.saturating_add(buffer).min(lines.len());
    let width = last.to_string().len();
    let mut out = String::new();
    for number in first..=last {
        let marker = if (region.start..=region.end).contains(&number) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(out, "{marker} {number:>width$} | {}", lines[number - 1]);
    }
    out
}

/// Report for an edit that was kept.
#[must_use]
pub fn verification_report(ctx: &ReportContext<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Edit verified: {}", ctx.command.describe());
    write_summary(&mut out, ctx);
    write_before_after(&mut out, ctx);

    if !ctx.critical.is_empty() {
        out.push_str("\nCritical errors (rollback disabled):\n");
        write_diagnostics(&mut out, ctx.critical.iter());
    }

    let others = non_critical(ctx);
    if others.is_empty() {
        if ctx.critical.is_empty() {
            out.push_str("\nDiagnostics: none\n");
        }
    } else {
        out.push_str("\nDiagnostics (non-critical):\n");
        write_diagnostics(&mut out, others);
    }
    out
}

/// Report for an edit that was undone.
#[must_use]
pub fn rollback_report(ctx: &ReportContext<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Edit rolled back: {}", ctx.command.describe());
    write_summary(&mut out, ctx);

    out.push_str("\nCritical errors:\n");
    write_diagnostics(&mut out, ctx.critical.iter());

    let others = non_critical(ctx);
    if !others.is_empty() {
        out.push_str("\nOther diagnostics:\n");
        write_diagnostics(&mut out, others);
    }

    write_before_after(&mut out, ctx);
    let _ = writeln!(
        out,
        "\nFile restored from backup (undo id {}).",
        ctx.undo_id
    );
    out
}

fn write_summary(out: &mut String, ctx: &ReportContext<'_>) {
    let _ = writeln!(out, "File: {}", ctx.path);
    let _ = writeln!(out, "Action: {}", ctx.command.action());
    let _ = writeln!(out, "Lines: {}", ctx.region);
    let validation = ctx.validation;
    let _ = write!(out, "Validator: {}", validation.validator_used);
    if let Some(server) = &validation.server {
        let _ = write!(out, " ({server})");
    }
    if validation.timed_out {
        out.push_str(", timed out");
    }
    out.push('\n');
    let _ = writeln!(out, "Undo id: {}", ctx.undo_id);
}

fn write_before_after(out: &mut String, ctx: &ReportContext<'_>) {
    out.push_str("\nBefore:\n");
    match ctx.original {
        Some(original) => {
            let before_region = ctx.command.op.line_range().unwrap_or(ctx.region);
            out.push_str(&numbered_context(original, before_region, ctx.buffer));
        }
        None => out.push_str("  (new file)\n"),
    }
    out.push_str("\nAfter:\n");
    out.push_str(&numbered_context(ctx.modified, ctx.region, ctx.buffer));

    let diff = generate_file_diff(ctx.path, ctx.original, ctx.modified);
    if !diff.is_empty() {
        out.push_str("\nDiff:\n");
        out.push_str(&diff);
        if !diff.ends_with('\n') {
            out.push('\n');
        }
    }
}

fn non_critical<'a>(ctx: &ReportContext<'a>) -> Vec<&'a Diagnostic> {
    ctx.validation
        .diagnostics()
        .filter(|d| !ctx.critical.contains(d))
        .collect()
}

fn write_diagnostics<'a>(out: &mut String, diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for diagnostic in diagnostics {
        let _ = writeln!(out, "  {diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_types::Range;

    #[test]
    fn test_context_marks_region_and_clamps() {
        let text = "a\nb\nc\nd\n";
        let ctx = numbered_context(text, LineRegion::new(2, 2), 1);
        assert_eq!(ctx, "  1 | a\n> 2 | b\n  3 | c\n");

        let ctx = numbered_context(text, LineRegion::new(4, 4), 5);
        assert!(ctx.starts_with("  1 | a"));
        assert!(ctx.ends_with("> 4 | d\n"));
    }

    #[test]
    fn test_context_of_empty_text() {
        assert_eq!(numbered_context("", LineRegion::new(1, 1), 5), "  (empty file)\n");
    }

    #[test]
    fn test_verified_report_separates_critical_errors() {
        use loom_types::{DiagnosticSeverity, ValidatorKind};

        let cmd = loom_edit::parse(">>LOOM_EDIT file=a.py REPLACE 1-1\nx = (\n<<LOOM_EDIT").unwrap();
        let critical = Diagnostic::error(Range::point(0, 4), "syntax error: unclosed '('", None);
        let mut warning = Diagnostic::error(Range::point(0, 0), "unused name x", None);
        warning.severity = Some(DiagnosticSeverity::Warning);
        let validation = ValidationResult::from_diagnostics(
            vec![critical.clone(), warning],
            ValidatorKind::Lsp,
            Some("python"),
        );
        let critical = [critical];
        let ctx = ReportContext {
            path: "a.py",
            command: &cmd,
            region: LineRegion::new(1, 1),
            original: Some("x = 1\n"),
            modified: "x = (\n",
            validation: &validation,
            critical: &critical,
            undo_id: "abc",
            buffer: 2,
        };

        let report = verification_report(&ctx);
        let critical_at = report.find("Critical errors (rollback disabled):").unwrap();
        let others_at = report.find("Diagnostics (non-critical):").unwrap();
        assert!(critical_at < others_at);
        assert!(report[critical_at..others_at].contains("unclosed"));
        assert!(report[others_at..].contains("unused name x"));
        assert!(!report[others_at..].contains("unclosed"));
    }
}
