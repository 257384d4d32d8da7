//! Diff generation utilities.
//!
//! Provides unified diff output for edit reports using the `similar` crate.

use similar::{ChangeTag, TextDiff};

/// Generate a compact diff between two strings.
///
/// Uses the `similar` crate for line-by-line diffing with three lines of
/// context. Hunks are separated by `...`.
///
/// # Arguments
/// * `original` - The original content
/// * `modified` - The modified content
///
/// # Returns
/// A string containing the diff with `+`, `-`, and ` ` prefixes.
#[must_use]
pub fn generate_unified_diff(original: &str, modified: &str) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let mut output = String::new();

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                output.push_str(sign);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}

/// Generate a standard unified diff with `---`/`+++` headers and `@@` hunk
/// ranges, suitable for `patch`. A created file diffs against `/dev/null`.
#[must_use]
pub fn generate_file_diff(path: &str, original: Option<&str>, modified: &str) -> String {
    let old_name = if original.is_some() {
        format!("a/{path}")
    } else {
        "/dev/null".to_string()
    };
    let new_name = format!("b/{path}");
    let diff = TextDiff::from_lines(original.unwrap_or(""), modified);
    diff.unified_diff()
        .context_radius(3)
        .header(&old_name, &new_name)
        .to_string()
}
