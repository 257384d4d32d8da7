#![allow(clippy::doc_markdown)]

//! loom-io - Safe file I/O for Loom
//!
//! Reading, line-ending handling and whole-file writes for the edit pipeline.
//!
//! # Features
//!
//! - **Dual API**: Sync (std::fs) for the patch applier and undo store,
//!   Async (tokio::fs) for the language-server client
//! - **Safety**: Binary detection & Size limits
//! - **Line endings**: `\r\n`, `\r` and `\n` normalization with style and
//!   trailing-newline bookkeeping
//! - **Atomic writes**: temp file + rename, so readers never see a partial file
//!
//! # Architecture
//!
//! ```text
//! loom-io/src/
//! ├── lib.rs      # Re-exports (this file)
//! ├── error.rs    # IoError enum
//! ├── detect.rs   # Binary detection & decoding
//! ├── newline.rs  # Line-ending normalization
//! ├── sync.rs     # Synchronous API (reads + atomic writes)
//! └── async_io.rs # Asynchronous API (Tokio)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use loom_io::{read_text_safe, atomic_write_text, NormalizedText};
//!
//! let raw = read_text_safe("src/main.rs", 1024 * 1024)?;
//! let text = NormalizedText::new(&raw);
//! atomic_write_text("src/main.rs", &text.render(&text.lines()))?;
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

mod async_io;
mod detect;
mod error;
mod newline;
mod sync;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use async_io::read_text_safe_async;
pub use error::IoError;
pub use newline::{LineEnding, NormalizedText, normalize_line_endings};
pub use sync::{
    DEFAULT_MAX_FILE_BYTES, atomic_write_bytes, atomic_write_text, read_text_safe,
    read_text_strict,
};

// Re-export detection utilities for advanced use
pub use detect::{decode_buffer, decode_buffer_strict, is_binary};
