//! Line-ending normalization.
//!
//! The applier works on `\n`-only text. [`NormalizedText`] remembers the
//! original terminator style and trailing-newline presence so the rewritten
//! file keeps both.

use std::borrow::Cow;

/// Line terminator style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl LineEnding {
    /// Style of the first terminator in `text`, if any.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let idx = bytes.iter().position(|&b| b == b'\n' || b == b'\r')?;
        if bytes[idx] == b'\n' {
            Some(Self::Lf)
        } else if bytes.get(idx + 1) == Some(&b'\n') {
            Some(Self::CrLf)
        } else {
            Some(Self::Cr)
        }
    }

    /// Terminator string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}

/// Convert `\r\n` and lone `\r` to `\n`.
#[must_use]
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// File content split into `\n`-normalized lines plus the bookkeeping needed
/// to write it back in its original style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    content: String,
    ending: LineEnding,
    trailing_newline: bool,
}

impl NormalizedText {
    /// Normalize raw file content.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let ending = LineEnding::detect(raw).unwrap_or_default();
        let mut content = normalize_line_endings(raw).into_owned();
        let trailing_newline = content.ends_with('\n');
        if trailing_newline {
            content.pop();
        }
        Self {
            content,
            ending,
            trailing_newline,
        }
    }

    /// Empty document for files that do not exist yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            content: String::new(),
            ending: LineEnding::Lf,
            trailing_newline: false,
        }
    }

    /// Detected terminator style.
    #[must_use]
    pub fn ending(&self) -> LineEnding {
        self.ending
    }

    /// Whether the original ended with a terminator.
    #[must_use]
    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Lines without terminators. An empty file has zero lines; a file that is
    /// only a terminator has one empty line.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        if self.content.is_empty() && !self.trailing_newline {
            return Vec::new();
        }
        self.content.split('\n').collect()
    }

    /// Number of lines as reported by [`Self::lines`].
    #[must_use]
    pub fn line_count(&self) -> usize {
        if self.content.is_empty() && !self.trailing_newline {
            0
        } else {
            self.content.matches('\n').count() + 1
        }
    }

    /// Normalized full text including the trailing `\n` when present.
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut out = self.content.clone();
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Join `lines` in the original style, restoring the trailing newline.
    #[must_use]
    pub fn render<S: AsRef<str>>(&self, lines: &[S]) -> String {
        if lines.is_empty() {
            return String::new();
        }
        let sep = self.ending.as_str();
        let mut out = lines
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(sep);
        if self.trailing_newline {
            out.push_str(sep);
        }
        out
    }

    /// Convert `\n`-normalized text back to the original terminator style.
    #[must_use]
    pub fn restyle(&self, normalized: &str) -> String {
        match self.ending {
            LineEnding::Lf => normalized.to_string(),
            other => normalized.replace('\n', other.as_str()),
        }
    }
}
