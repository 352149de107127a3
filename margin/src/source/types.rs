//! Owned data types for the source-highlighting background thread.
//!
//! Everything here is `Send` with no borrowed lifetimes, so payloads can move
//! from the worker thread into `AppState` as-is.

use std::path::PathBuf;

use margin_core::types::FileUri;

/// Commands sent from the main thread to the source worker.
#[derive(Debug)]
pub enum SourceRequest {
    /// Read and highlight one file.
    Load {
        /// Identifier the result is reported under.
        file: FileUri,
        /// Local path to read.
        path: PathBuf,
    },
}

/// Result sent back from the worker inside `AppEvent::SourceLoaded`.
///
/// Boxed on the channel because `lines` can be large.
#[derive(Debug)]
pub struct SourcePayload {
    /// The file this payload belongs to; stale payloads are dropped.
    pub file: FileUri,
    /// One highlighted line per source line, gutter not included.
    pub lines: Vec<ratatui::text::Line<'static>>,
    /// Set when the file could not be read; `lines` is then empty.
    pub error: Option<String>,
}
