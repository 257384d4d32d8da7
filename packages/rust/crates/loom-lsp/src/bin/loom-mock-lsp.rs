//! Minimal scripted language server for integration tests.
//!
//! Publishes diagnostics on `didOpen` based on markers in the text:
//! a line containing `SYNTAX_ERROR` yields an error, `WARN` a warning and
//! `HINT` a hint. After `initialized` it asks the client for
//! `workspace/configuration` once.
//!
//! Flags:
//! - `--silent`: never publish diagnostics
//! - `--hang-init`: never answer `initialize`
//! - `--crash-on-open`: exit as soon as a document is opened

use loom_lsp::LspError;
use loom_lsp::codec::{encode_message, read_message};
use serde_json::{Value, json};
use tokio::io::{AsyncWriteExt, BufReader, Stdout};

struct Flags {
    silent: bool,
    hang_init: bool,
    crash_on_open: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), LspError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let flags = Flags {
        silent: args.iter().any(|a| a == "--silent"),
        hang_init: args.iter().any(|a| a == "--hang-init"),
        crash_on_open: args.iter().any(|a| a == "--crash-on-open"),
    };

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    while let Some(message) = read_message(&mut stdin).await? {
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let id = message.get("id").cloned();
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        match (method, id) {
            ("initialize", Some(id)) => {
                if flags.hang_init {
                    continue;
                }
                let result = json!({
                    "capabilities": {"textDocumentSync": 1},
                    "serverInfo": {"name": "loom-mock-lsp"}
                });
                send(&mut stdout, json!({"jsonrpc": "2.0", "id": id, "result": result})).await?;
            }
            ("initialized", None) => {
                let request = json!({
                    "jsonrpc": "2.0",
                    "id": "cfg-1",
                    "method": "workspace/configuration",
                    "params": {"items": [{"section": "mock"}]}
                });
                send(&mut stdout, request).await?;
            }
            ("textDocument/didOpen", None) => {
                if flags.crash_on_open {
                    std::process::exit(3);
                }
                if flags.silent {
                    continue;
                }
                let doc = &params["textDocument"];
                let text = doc["text"].as_str().unwrap_or("");
                let publish = json!({
                    "jsonrpc": "2.0",
                    "method": "textDocument/publishDiagnostics",
                    "params": {
                        "uri": doc["uri"],
                        "version": doc["version"],
                        "diagnostics": diagnostics_for(text),
                    }
                });
                send(&mut stdout, publish).await?;
            }
            ("shutdown", Some(id)) => {
                send(&mut stdout, json!({"jsonrpc": "2.0", "id": id, "result": null})).await?;
            }
            ("exit", _) => std::process::exit(0),
            ("", _) | (_, None) => {}
            (other, Some(id)) => {
                let error = json!({"code": -32601, "message": format!("method not found: {other}")});
                send(&mut stdout, json!({"jsonrpc": "2.0", "id": id, "error": error})).await?;
            }
        }
    }
    Ok(())
}

fn diagnostics_for(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for (line, content) in text.lines().enumerate() {
        let marker = [
            ("SYNTAX_ERROR", 1, "syntax error: unexpected token"),
            ("WARN", 2, "style warning"),
            ("HINT", 4, "consider simplifying"),
        ]
        .into_iter()
        .find(|(needle, _, _)| content.contains(needle));
        if let Some((needle, severity, message)) = marker {
            let col = content.find(needle).unwrap_or(0);
            out.push(json!({
                "range": {
                    "start": {"line": line, "character": col},
                    "end": {"line": line, "character": col + needle.len()}
                },
                "severity": severity,
                "source": "mock",
                "message": message
            }));
        }
    }
    out
}

async fn send(stdout: &mut Stdout, message: Value) -> Result<(), LspError> {
    let frame = encode_message(&message)?;
    stdout.write_all(&frame).await?;
    stdout.flush().await?;
    Ok(())
}
