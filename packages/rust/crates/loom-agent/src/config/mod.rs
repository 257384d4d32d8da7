//! Config namespace: layered `settings.yaml` loading.

mod settings;

pub use settings::{
    DEFAULT_UNDO_DIR, LspSettings, RuntimeSettings, UndoSettings, ValidationSettings,
    load_runtime_settings, load_runtime_settings_from_paths, runtime_settings_paths,
    set_config_home_override,
};
