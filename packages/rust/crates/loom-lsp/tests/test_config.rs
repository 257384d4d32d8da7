//! Tests for server configuration (de)serialization and defaults.

use std::time::Duration;

use loom_lsp::{LspManagerConfig, LspServerConfig, default_servers};

#[test]
fn test_yaml_minimal_server() {
    let cfg: LspServerConfig = serde_yaml::from_str("command: gopls\n").unwrap();
    assert_eq!(cfg.command, "gopls");
    assert!(cfg.args.is_empty());
    assert!(cfg.enabled);
    assert!(cfg.init_options.is_none());
}

#[test]
fn test_json_full_server() {
    let json = r#"{"command":"pylsp","args":["-v"],"init_options":{"plugins":{}},"env":{"A":"1"},"enabled":false}"#;
    let cfg: LspServerConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.args, vec!["-v"]);
    assert_eq!(cfg.env.get("A").map(String::as_str), Some("1"));
    assert!(!cfg.enabled);
    assert!(cfg.init_options.is_some());
}

#[test]
fn test_default_table() {
    let servers = default_servers();
    assert_eq!(servers["rust"].command, "rust-analyzer");
    assert_eq!(servers["typescript"].args, vec!["--stdio"]);
    assert_eq!(servers["cpp"].command, "clangd");
    assert!(!servers.contains_key("json"));
}

#[test]
fn test_manager_defaults_and_override() {
    let cfg = LspManagerConfig::new("/ws").with_server("rust", LspServerConfig::new("ra-custom", &[]));
    assert_eq!(cfg.request_timeout, Duration::from_secs(10));
    assert_eq!(cfg.diagnostics_timeout, Duration::from_secs(3));
    assert_eq!(cfg.max_strikes, 3);
    assert_eq!(cfg.server_for("rust").unwrap().command, "ra-custom");

    let mut disabled = LspServerConfig::new("gopls", &[]);
    disabled.enabled = false;
    let cfg = cfg.with_server("go", disabled);
    assert!(cfg.server_for("go").is_none());
}
