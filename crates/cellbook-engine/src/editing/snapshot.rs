use crate::editing::{CellId, CellType, Document, escape};

/// Immutable document snapshot for UI rendering.
///
/// Snapshots are the engine's read API: an ordered collection of cell
/// view-models describing how to render the notebook without exposing the
/// rope buffer. UI layers render from snapshots and feed edits back through
/// [`crate::editing::Cmd`]s; they never mutate the document directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Document version for change detection.
    pub version: u64,
    /// Cell view-models in document order. Empty when the document failed
    /// to parse as a notebook.
    pub cells: Vec<CellView>,
    /// Why the document degraded to the zero-cell view, if it did.
    pub malformed: Option<String>,
}

/// UI-ready view of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    /// Stable identifier that survives tracked edits.
    pub id: CellId,
    /// Position in the `cells` array.
    pub index: usize,
    pub cell_type: CellType,
    /// Logical (unescaped) source text.
    pub source: String,
    /// Byte range of the source literal body in the document.
    pub byte_range: std::ops::Range<usize>,
}

/// Create an immutable snapshot from the document's tracked spans.
pub(crate) fn create_snapshot(doc: &mut Document) -> Snapshot {
    let version = doc.version();
    let malformed = doc.malformed_reason().map(str::to_string);

    // Materialize the spans so slicing the buffer below can re-borrow doc.
    let spans = doc.cells().to_vec();

    let mut cells = Vec::new();
    for span in &spans {
        let raw = doc.slice_to_cow(span.source_range.clone());
        // The literal was verified when the span was derived; fall back to
        // the raw slice rather than dropping the cell if it somehow is not.
        let source = escape::unescape_fragment(&raw)
            .map(|u| u.text)
            .unwrap_or_else(|_| raw.to_string());

        cells.push(CellView {
            id: span.id,
            index: span.index,
            cell_type: span.cell_type.clone(),
            source,
            byte_range: span.source_range.clone(),
        });
    }

    Snapshot {
        version,
        cells,
        malformed,
    }
}
