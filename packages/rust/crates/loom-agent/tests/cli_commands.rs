#![allow(missing_docs)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const LOOM: &str = env!("CARGO_BIN_EXE_loom");

fn loom(ws: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(LOOM)
        .arg("--workspace")
        .arg(ws)
        .args(args)
        .env("HOME", ws.join("home"))
        .env("LOOM_CONFIG_HOME", ws.join("conf"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn loom");
    {
        let mut pipe = child.stdin.take().expect("stdin");
        pipe.write_all(stdin.unwrap_or("").as_bytes())
            .expect("write stdin");
    }
    child.wait_with_output().expect("wait loom")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn workspace() -> TempDir {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::write(tmp.path().join("data.json"), "{\n  \"a\": 1\n}\n").expect("seed");
    tmp
}

#[test]
fn apply_from_stdin_reports_verification() {
    let ws = workspace();
    let out = loom(
        ws.path(),
        &["apply"],
        Some(">>LOOM_EDIT file=data.json REPLACE 2-2\n  \"a\": 2\n<<LOOM_EDIT\n"),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).starts_with("Edit verified: REPLACE 2 data.json"));
    let text = std::fs::read_to_string(ws.path().join("data.json")).expect("read");
    assert!(text.contains("\"a\": 2"));
}

#[test]
fn apply_rollback_is_a_successful_run() {
    let ws = workspace();
    let out = loom(
        ws.path(),
        &["apply"],
        Some(">>LOOM_EDIT file=data.json DELETE 3-3\n<<LOOM_EDIT\n"),
    );
    assert!(out.status.success());
    assert!(stdout(&out).contains("File restored from backup"));
    let text = std::fs::read_to_string(ws.path().join("data.json")).expect("read");
    assert_eq!(text, "{\n  \"a\": 1\n}\n");
}

#[test]
fn apply_parse_error_exits_non_zero() {
    let ws = workspace();
    let out = loom(
        ws.path(),
        &["apply", "--json"],
        Some(">>LOOM_EDIT file=data.json REPLACE 2\n<<LOOM_EDIT\n>>LOOM_EDIT file=data.json\n<<LOOM_EDIT\n"),
    );
    assert!(!out.status.success());
    let items: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json output");
    assert_eq!(items.as_array().map(Vec::len), Some(2));
    assert_eq!(items[1]["status"], "error");
}

#[test]
fn apply_without_blocks_fails() {
    let ws = workspace();
    let out = loom(ws.path(), &["apply"], Some("just prose, no edits\n"));
    assert!(!out.status.success());
}

#[test]
fn history_and_undo_roundtrip() {
    let ws = workspace();
    let input = ws.path().join("edit.txt");
    std::fs::write(
        &input,
        ">>LOOM_EDIT file=notes.md CREATE\n# Notes\n<<LOOM_EDIT\n",
    )
    .expect("write input");
    let out = loom(ws.path(), &["apply", "--input", input.to_str().expect("utf8")], None);
    assert!(out.status.success());
    assert!(ws.path().join("notes.md").exists());

    let out = loom(ws.path(), &["history", "--json"], None);
    let history: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json");
    assert_eq!(history[0]["kind"], "file_create");
    assert_eq!(history[0]["applied"], true);

    let out = loom(ws.path(), &["undo"], None);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("Undone "));
    assert!(!ws.path().join("notes.md").exists());

    let out = loom(ws.path(), &["undo"], None);
    assert!(!out.status.success());
}

#[test]
fn validate_reports_invalid_json() {
    let ws = workspace();
    std::fs::write(ws.path().join("bad.json"), "{").expect("seed");
    let out = loom(ws.path(), &["validate", "bad.json"], None);
    assert!(!out.status.success());
    assert!(stdout(&out).starts_with("bad.json: invalid [fallback json"));

    let out = loom(ws.path(), &["validate", "data.json", "--json"], None);
    assert!(out.status.success());
    let result: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json");
    assert_eq!(result["is_valid"], true);
}

#[test]
fn schema_lists_and_prints_types() {
    let ws = workspace();
    let out = loom(ws.path(), &["schema"], None);
    assert!(stdout(&out).lines().any(|l| l == "ValidationResult"));

    let out = loom(ws.path(), &["schema", "Diagnostic"], None);
    assert!(out.status.success());
    let schema: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("schema json");
    assert!(schema.get("properties").is_some());

    let out = loom(ws.path(), &["schema", "Nope"], None);
    assert!(!out.status.success());
}
