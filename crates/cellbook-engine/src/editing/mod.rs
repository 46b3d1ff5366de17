/*!
 * # Editing Core Module
 *
 * Implements the notebook editing model: a JSON notebook document held in a
 * single buffer, with tracked byte ranges for each cell's source literal.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: xi-rope Buffer
 * - The entire notebook file is stored in one **`xi_rope::Rope`** buffer
 * - Provides efficient insert/delete operations and **Delta** representation of edits
 * - **Lossless round-trip**: saving writes rope bytes verbatim
 *
 * ### 2. Command-Based Editing
 * - All edits are **Commands** (`Cmd` enum) that compile to **Deltas**
 * - `ReplaceCellText` is the tracked path: a cell-local edit is translated
 *   into a single whole-document replace operation, with the replacement
 *   re-escaped as a JSON string-literal body
 * - Raw-text commands are the out-of-band path and invalidate the span cache
 *
 * ### 3. Incremental Parsing with Tree-sitter
 * - Uses the **Tree-sitter JSON** grammar over the rope buffer
 * - Feeds edits via `tree.edit()`, then re-parses against the old tree
 *
 * ### 4. Cell Spans
 * - **CellSpans** record where each cell's `source` string-literal body lives
 *   in the document, plus an escape table mapping logical (unescaped) source
 *   offsets to literal offsets
 * - Span ranges are transformed through Deltas using xi-rope's interval
 *   transformation, so tracked edits shift later cells without a re-parse
 * - Any edit not proven safe to shift marks the whole cache stale; the next
 *   access re-extracts spans from the current parse tree
 *
 * ### 5. Read API: Immutable Snapshots
 * - The core exposes **Snapshots** of cell view-models without exposing the
 *   rope directly; UI layers render from snapshots and feed edits back
 *   through commands
 *
 * ## Module Structure
 *
 * - **`document`**: Core `Document` type with rope buffer and Tree-sitter integration
 * - **`commands`**: `Cmd` enum and delta compilation for all edit operations
 * - **`cells`**: Cell span extraction, transformation, and offset mapping
 * - **`escape`**: JSON string-literal escaping with offset bookkeeping
 * - **`snapshot`**: Immutable cell view generation for UI consumption
 * - **`patch`**: Edit result metadata
 */

// Module exports
pub mod cells;
pub mod commands;
pub mod document;
pub mod escape;
pub mod patch;
pub mod snapshot;

// Public API re-exports
pub use cells::{CellId, CellSpan, CellType};
pub use commands::Cmd;
pub use document::Document;
pub use patch::Patch;
pub use snapshot::{CellView, Snapshot};

use std::ops::Range;

/// Errors surfaced by notebook parsing and edit translation.
///
/// None of these are fatal to a hosting process: a malformed notebook
/// degrades to a zero-cell view and remains editable as raw text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotebookError {
    /// The document is not valid JSON, or lacks the expected notebook shape
    /// (a top-level `cells` array of objects with `source` and `cell_type`
    /// string members).
    #[error("malformed notebook document: {0}")]
    MalformedDocument(String),

    /// A caller passed a cell index outside the tracked span sequence.
    #[error("cell index {index} out of range ({count} cells)")]
    InvalidCellIndex { index: usize, count: usize },

    /// A cell-local edit range does not fit the cell's source.
    #[error("edit range {}..{} exceeds cell source length {len}", range.start, range.end)]
    InvalidCellRange { range: Range<usize>, len: usize },

    /// A raw edit range does not fit the document.
    #[error("edit range {}..{} exceeds document length {len}", range.start, range.end)]
    InvalidDocumentRange { range: Range<usize>, len: usize },

    /// Replacement text could not be embedded as a JSON string-literal body.
    /// This indicates an escaping invariant violation and is surfaced rather
    /// than silently ignored.
    #[error("replacement text cannot be embedded as a JSON string literal")]
    EscapeFailure,
}
