//! Loom front end: settings loading and pipeline wiring for the `loom` CLI.

#![allow(missing_docs)]

mod config;
mod runtime;

pub use config::{
    DEFAULT_UNDO_DIR, LspSettings, RuntimeSettings, UndoSettings, ValidationSettings,
    load_runtime_settings, load_runtime_settings_from_paths, runtime_settings_paths,
    set_config_home_override,
};
pub use runtime::build_coordinator;
