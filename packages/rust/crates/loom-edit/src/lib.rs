#![allow(clippy::doc_markdown)]

//! loom-edit - LOOM_EDIT command parsing and line-addressed patching
//!
//! Turns the agent's textual edit directives into structured commands and
//! applies them to files with line-ending and trailing-newline fidelity.
//!
//! # Wire format
//!
//! ```text
//! >>LOOM_EDIT file=<path> [v=<hash>] <ACTION> [<start>[-<end>]]
//! <body lines…>
//! <<LOOM_EDIT
//! ```
//!
//! `ACTION` is one of `REPLACE`, `INSERT_AFTER`, `INSERT_BEFORE`, `DELETE`,
//! `SEARCH_REPLACE` (carries `"<old>" "<new>"` on the header) or `CREATE`.
//!
//! # Architecture
//!
//! ```text
//! loom-edit/src/
//! ├── lib.rs       # Re-exports (this file)
//! ├── error.rs     # ParseError / EditError enums (thiserror)
//! ├── types.rs     # EditCommand, EditOp, EditAction, ApplyOutcome, EditConfig
//! ├── scanner.rs   # Quote-aware header tokenizer
//! ├── parser.rs    # Block extraction and header interpretation
//! ├── applier.rs   # PatchApplier
//! ├── hash.rs      # Optional `v=` content hash guard
//! ├── workspace.rs # Workspace-relative path resolution
//! └── diff.rs      # Diff generation utilities
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use loom_edit::{parse, PatchApplier, EditConfig};
//!
//! let cmd = parse(">>LOOM_EDIT file=src/lib.rs REPLACE 3-3\nlet x = 1;\n<<LOOM_EDIT")?;
//! let outcome = PatchApplier::apply("src/lib.rs".as_ref(), &cmd, &EditConfig::default())?;
//! println!("{}", outcome.region);
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

mod applier;
mod diff;
mod error;
mod hash;
mod parser;
mod scanner;
mod types;
mod workspace;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use applier::PatchApplier;
pub use error::{EditError, ParseError};
pub use hash::{MIN_HASH_PREFIX, content_hash, verify_file_hash};
pub use parser::{parse, parse_all};
pub use types::{
    ApplyOutcome, CLOSING_MARKER, EditAction, EditCommand, EditConfig, EditOp, HEADER_MARKER,
};
pub use workspace::resolve_in_workspace;

// Re-export diff utilities for report rendering
pub use diff::{generate_file_diff, generate_unified_diff};
