//! loom-undo - Undo history for file edits.
//!
//! Every edit the guard applies is recorded before the file is touched:
//! the pre-edit bytes go to `backups/<millis>-<id>.bak` and the action is
//! appended to `history.json`. Undo restores the backup (or removes a file
//! the edit created).
//!
//! ```text
//! <undo dir>/
//! ├── history.json
//! └── backups/
//!     └── 1760000000000-3f2a….bak
//! ```

mod action;
mod error;
mod store;

pub use action::{UndoAction, UndoKind};
pub use error::UndoError;
pub use store::{BACKUP_DIR, DEFAULT_MAX_ENTRIES, HISTORY_FILE, UndoStore};
