//! JSON-RPC message shapes and the slice of LSP this client speaks.

use std::path::Path;

use loom_types::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::error::LspError;

/// `initialize` request.
pub const INITIALIZE: &str = "initialize";
/// `initialized` notification.
pub const INITIALIZED: &str = "initialized";
/// `shutdown` request.
pub const SHUTDOWN: &str = "shutdown";
/// `exit` notification.
pub const EXIT: &str = "exit";
/// `textDocument/didOpen` notification.
pub const DID_OPEN: &str = "textDocument/didOpen";
/// `textDocument/didClose` notification.
pub const DID_CLOSE: &str = "textDocument/didClose";
/// `textDocument/publishDiagnostics` notification.
pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
/// `workspace/configuration` server request.
pub const WORKSPACE_CONFIGURATION: &str = "workspace/configuration";

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Message.
    pub message: String,
}

/// A classified message read from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Reply to one of our requests.
    Response {
        /// Request id.
        id: i64,
        /// `result` or `error`.
        result: Result<Value, RpcError>,
    },
    /// Server-to-client request that needs an answer.
    Request {
        /// Request id, echoed back verbatim.
        id: Value,
        /// Method.
        method: String,
        /// Params or `null`.
        params: Value,
    },
    /// Server notification.
    Notification {
        /// Method.
        method: String,
        /// Params or `null`.
        params: Value,
    },
}

/// `textDocument/publishDiagnostics` params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    /// Document URI.
    pub uri: String,
    /// Document version the diagnostics refer to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// Full diagnostic set for the document.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify a raw message.
///
/// # Errors
/// `Protocol` when the message is neither a request, notification nor a
/// response with a numeric id.
pub fn classify(message: Value) -> Result<Incoming, LspError> {
    let Value::Object(mut map) = message else {
        return Err(LspError::Protocol("message is not an object".to_string()));
    };
    let params = map.remove("params").unwrap_or(Value::Null);

    if let Some(Value::String(method)) = map.remove("method") {
        return Ok(match map.remove("id") {
            Some(id) if !id.is_null() => Incoming::Request { id, method, params },
            _ => Incoming::Notification { method, params },
        });
    }

    let id = match map.get("id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| LspError::Protocol(format!("response without usable id: {:?}", map.get("id"))))?;

    let result = match map.remove("error") {
        Some(error) if !error.is_null() => Err(serde_json::from_value::<RpcError>(error)?),
        _ => Ok(map.remove("result").unwrap_or(Value::Null)),
    };
    Ok(Incoming::Response { id, result })
}

/// Build a request.
#[must_use]
pub fn request(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

/// Build a notification. `null` params are omitted.
#[must_use]
pub fn notification(method: &str, params: Value) -> Value {
    if params.is_null() {
        json!({"jsonrpc": "2.0", "method": method})
    } else {
        json!({"jsonrpc": "2.0", "method": method, "params": params})
    }
}

/// Build a success response.
#[must_use]
pub fn response(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

/// Answer for a server-to-client request. `workspace/configuration` gets
/// one `null` per requested item; everything else gets `null`.
#[must_use]
pub fn answer_server_request(method: &str, params: &Value) -> Value {
    if method == WORKSPACE_CONFIGURATION {
        let items = params
            .get("items")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        return Value::Array(vec![Value::Null; items]);
    }
    Value::Null
}

/// `file://` URI for an absolute path.
///
/// # Errors
/// `InvalidPath` for relative paths.
pub fn path_to_uri(path: &Path) -> Result<String, LspError> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| LspError::InvalidPath(path.display().to_string()))
}

/// Compare document URIs by the file they name, so percent-encoding and
/// drive-letter case differences between client and server do not matter.
#[must_use]
pub fn uris_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (Url::parse(a), Url::parse(b)) {
        (Ok(ua), Ok(ub)) => match (ua.to_file_path(), ub.to_file_path()) {
            (Ok(pa), Ok(pb)) => pa == pb,
            _ => ua == ub,
        },
        _ => false,
    }
}

/// `initialize` params: process id, root, one workspace folder and the
/// minimal client capabilities needed for pushed diagnostics.
///
/// # Errors
/// `InvalidPath` when `root` is relative.
pub fn initialize_params(root: &Path, init_options: Option<Value>) -> Result<Value, LspError> {
    let root_uri = path_to_uri(root)?;
    let name = root
        .file_name()
        .map_or_else(|| "workspace".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(json!({
        "processId": std::process::id(),
        "clientInfo": {"name": "loom", "version": env!("CARGO_PKG_VERSION")},
        "rootUri": root_uri,
        "workspaceFolders": [{"uri": root_uri, "name": name}],
        "capabilities": {
            "textDocument": {
                "synchronization": {"didSave": false, "dynamicRegistration": false},
                "publishDiagnostics": {"relatedInformation": false, "versionSupport": true}
            },
            "workspace": {"configuration": true, "workspaceFolders": true}
        },
        "initializationOptions": init_options.unwrap_or(Value::Null),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_shapes() {
        let resp = classify(json!({"jsonrpc":"2.0","id":3,"result":{"ok":true}})).unwrap();
        assert!(matches!(resp, Incoming::Response { id: 3, result: Ok(_) }));

        let err = classify(json!({"id":"4","error":{"code":-32601,"message":"nope"}})).unwrap();
        assert!(matches!(err, Incoming::Response { id: 4, result: Err(RpcError { code: -32601, .. }) }));

        let req = classify(json!({"id":7,"method":"workspace/configuration","params":{}})).unwrap();
        assert!(matches!(req, Incoming::Request { .. }));

        let note = classify(json!({"method":"window/logMessage","params":{"message":"hi"}})).unwrap();
        assert!(matches!(note, Incoming::Notification { .. }));

        assert!(classify(json!([1, 2])).is_err());
    }

    #[test]
    fn test_configuration_answer_matches_items() {
        let params = json!({"items": [{"section": "a"}, {"section": "b"}]});
        assert_eq!(
            answer_server_request(WORKSPACE_CONFIGURATION, &params),
            json!([null, null])
        );
        assert_eq!(answer_server_request("client/registerCapability", &params), Value::Null);
    }

    #[cfg(unix)]
    #[test]
    fn test_uri_roundtrip_and_match() {
        let uri = path_to_uri(Path::new("/tmp/my dir/a.rs")).unwrap();
        assert_eq!(uri, "file:///tmp/my%20dir/a.rs");
        assert!(uris_match(&uri, "file:///tmp/my dir/a.rs"));
        assert!(!uris_match(&uri, "file:///tmp/other.rs"));
        assert!(path_to_uri(Path::new("relative.rs")).is_err());
    }
}
