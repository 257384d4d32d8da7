//! File extension to language mapping.

use std::path::Path;

/// Language key for `path`, used to pick a server and a fallback checker.
#[must_use]
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let lang = match ext.as_str() {
        "rs" => "rust",
        "go" => "go",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" | "pyi" => "python",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        _ => return None,
    };
    Some(lang)
}

/// LSP `languageId` for a document.
#[must_use]
pub fn language_id(language: &str, path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match (language, ext.as_deref()) {
        ("typescript", Some("tsx")) => "typescriptreact".to_string(),
        ("javascript", Some("jsx")) => "javascriptreact".to_string(),
        _ => language.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(detect_language(Path::new("src/main.rs")), Some("rust"));
        assert_eq!(detect_language(Path::new("App.TSX")), Some("typescript"));
        assert_eq!(detect_language(Path::new("pkg/x.json")), Some("json"));
        assert_eq!(detect_language(Path::new("Makefile")), None);
        assert_eq!(detect_language(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_language_id() {
        assert_eq!(language_id("typescript", Path::new("a.tsx")), "typescriptreact");
        assert_eq!(language_id("typescript", Path::new("a.ts")), "typescript");
        assert_eq!(language_id("cpp", Path::new("a.hpp")), "cpp");
    }
}
