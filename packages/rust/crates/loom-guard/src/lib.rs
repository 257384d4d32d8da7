//! loom-guard - validate applied edits and roll back the ones that break code
//!
//! ```text
//! EditCommand ─▶ RollbackCoordinator ─▶ PatchApplier (backup recorded first)
//!                        │
//!                        ▼
//!                 ValidationEngine ── LspManager ──▶ language server
//!                        │        └── fallback checkers (JSON, YAML)
//!                        ▼
//!         critical error? ── yes ─▶ UndoStore::undo + rollback report
//!                        └─ no ──▶ verification report
//! ```

mod config;
mod coordinator;
mod engine;
mod error;
mod fallback;
mod report;

pub use config::{DEFAULT_CONTEXT_BUFFER_LINES, GuardConfig, HEURISTIC_PATTERNS, default_critical_patterns};
pub use coordinator::{EditOutcome, EditStatus, RollbackCoordinator};
pub use engine::ValidationEngine;
pub use error::GuardError;
pub use fallback::{FallbackChecker, JsonChecker, YamlChecker, default_checkers};
pub use report::{ReportContext, numbered_context, rollback_report, verification_report};
