use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::escape;
use crate::editing::{Document, NotebookError};

/// Commands that can be applied to the document.
///
/// `ReplaceCellText` is the tracked edit path: the edit is expressed in the
/// cell's own logical coordinate space and translated into a single
/// document-global replace. The raw-text commands are the out-of-band path
/// for callers editing the document as plain text; they invalidate the
/// span cache wholesale.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Replace `range` (logical offsets into the cell's unescaped source)
    /// of cell `cell` with `text`.
    ReplaceCellText {
        cell: usize,
        range: std::ops::Range<usize>,
        text: String,
    },
    InsertText {
        at: usize,
        text: String,
    },
    DeleteRange {
        range: std::ops::Range<usize>,
    },
    ReplaceRange {
        range: std::ops::Range<usize>,
        text: String,
    },
    /// Swap the entire document content, e.g. after re-serializing the
    /// structured notebook model. Coarse but simple: the whole-document
    /// replace still participates in the host's normal edit pipeline.
    ReplaceDocument {
        text: String,
    },
}

/// Compile a command into a delta.
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Result<Delta<RopeInfo>, NotebookError> {
    match cmd {
        Cmd::ReplaceCellText { cell, range, text } => {
            let spans = doc.current_spans();
            let span = spans.get(*cell).ok_or(NotebookError::InvalidCellIndex {
                index: *cell,
                count: spans.len(),
            })?;
            if range.start > range.end || range.end > span.logical_len {
                return Err(NotebookError::InvalidCellRange {
                    range: range.clone(),
                    len: span.logical_len,
                });
            }

            let escaped = escape::escape_fragment(text);
            // Verification unescape: a mismatch here means the replacement
            // cannot be embedded faithfully and must not be applied.
            let verified = escape::unescape_fragment(&escaped)
                .map_err(|_| NotebookError::EscapeFailure)?;
            if verified.text != *text {
                return Err(NotebookError::EscapeFailure);
            }

            let global = span.to_document_offset(range.start)..span.to_document_offset(range.end);
            let mut builder = Builder::new(doc.len());
            builder.replace(global, Rope::from(escaped));
            Ok(builder.build())
        }
        Cmd::InsertText { at, text } => {
            check_document_range(doc, *at..*at)?;
            let mut builder = Builder::new(doc.len());
            builder.replace(*at..*at, Rope::from(text));
            Ok(builder.build())
        }
        Cmd::DeleteRange { range } => {
            check_document_range(doc, range.clone())?;
            let mut builder = Builder::new(doc.len());
            builder.delete(range.clone());
            Ok(builder.build())
        }
        Cmd::ReplaceRange { range, text } => {
            check_document_range(doc, range.clone())?;
            let mut builder = Builder::new(doc.len());
            builder.replace(range.clone(), Rope::from(text));
            Ok(builder.build())
        }
        Cmd::ReplaceDocument { text } => {
            let mut builder = Builder::new(doc.len());
            builder.replace(0..doc.len(), Rope::from(text));
            Ok(builder.build())
        }
    }
}

/// Raw edit offsets come straight from the caller, so they are validated
/// before reaching the delta builder.
fn check_document_range(
    doc: &Document,
    range: std::ops::Range<usize>,
) -> Result<(), NotebookError> {
    if range.start > range.end || range.end > doc.len() {
        return Err(NotebookError::InvalidDocumentRange {
            range,
            len: doc.len(),
        });
    }
    Ok(())
}
