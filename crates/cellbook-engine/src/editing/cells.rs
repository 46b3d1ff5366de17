//! Cell span extraction and offset mapping.
//!
//! A notebook document is a JSON file with a top-level `cells` array. Each
//! tracked cell records the byte range of its `source` string-literal body
//! within the raw document, plus an escape adjustment table so cell-local
//! (logical) offsets can be mapped into document (literal) offsets and back.

use uuid::Uuid;
use xi_rope::delta::Transformer;
use xi_rope::{Delta, RopeInfo};

use crate::editing::escape::{self, Unescaped};
use crate::editing::{Document, NotebookError};

/// Stable identifier for a cell that survives tracked edits.
///
/// When the document's cell object carries a well-formed `id` member it is
/// reused, so handles also survive a full re-parse; otherwise a fresh id is
/// minted per extraction.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CellId(pub Uuid);

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of a notebook cell, from its `cell_type` member.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
    Other(String),
}

impl CellType {
    pub fn as_str(&self) -> &str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
            CellType::Other(s) => s,
        }
    }
}

impl From<String> for CellType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "code" => CellType::Code,
            "markdown" => CellType::Markdown,
            "raw" => CellType::Raw,
            _ => CellType::Other(s),
        }
    }
}

impl From<CellType> for String {
    fn from(t: CellType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked byte range for one cell's source literal.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSpan {
    pub id: CellId,
    /// Position of the cell in the `cells` array.
    pub index: usize,
    pub cell_type: CellType,
    /// Byte range of the source string-literal body, quotes excluded.
    pub source_range: std::ops::Range<usize>,
    /// Escape adjustment table for the literal; see [`escape::to_literal`].
    pub escapes: Vec<(usize, usize)>,
    /// Length of the logical (unescaped) source in bytes.
    pub logical_len: usize,
}

impl CellSpan {
    /// Map a logical source offset to a document byte offset.
    pub fn to_document_offset(&self, logical: usize) -> usize {
        self.source_range.start + escape::to_literal(&self.escapes, logical)
    }

    /// Map a document byte offset within this span back to a logical offset.
    pub fn to_local_offset(&self, document_offset: usize) -> usize {
        let literal = document_offset.saturating_sub(self.source_range.start);
        escape::to_logical(&self.escapes, literal)
    }

    /// Whether a document byte offset falls within this cell's source.
    /// The end bound is inclusive so a caret at the very end of the source
    /// (just before the closing quote) still counts as inside.
    pub fn contains_document_offset(&self, document_offset: usize) -> bool {
        document_offset >= self.source_range.start && document_offset <= self.source_range.end
    }
}

/// Extract cell spans from the document's current parse tree.
///
/// Member lookup is order-independent: `cells`, `source`, and `cell_type`
/// are found by key wherever they appear in their object.
pub(crate) fn extract_cell_spans(doc: &Document) -> Result<Vec<CellSpan>, NotebookError> {
    let tree = doc
        .tree
        .as_ref()
        .ok_or_else(|| NotebookError::MalformedDocument("document has no parse tree".to_string()))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(NotebookError::MalformedDocument(
            "document is not valid JSON".to_string(),
        ));
    }

    let text = doc.text();
    let top = root
        .named_child(0)
        .filter(|node| node.kind() == "object")
        .ok_or_else(|| {
            NotebookError::MalformedDocument("document has no top-level object".to_string())
        })?;

    let cells_value = find_member(top, "cells", &text).ok_or_else(|| {
        NotebookError::MalformedDocument("document has no `cells` member".to_string())
    })?;
    if cells_value.kind() != "array" {
        return Err(NotebookError::MalformedDocument(
            "`cells` member is not an array".to_string(),
        ));
    }

    let mut spans = Vec::new();
    let mut cursor = cells_value.walk();
    for (index, cell_node) in cells_value.named_children(&mut cursor).enumerate() {
        if cell_node.kind() != "object" {
            return Err(NotebookError::MalformedDocument(format!(
                "cell {index} is not an object"
            )));
        }

        let source_node = find_member(cell_node, "source", &text)
            .filter(|node| node.kind() == "string")
            .ok_or_else(|| {
                NotebookError::MalformedDocument(format!(
                    "cell {index} is missing a `source` string"
                ))
            })?;
        let type_node = find_member(cell_node, "cell_type", &text)
            .filter(|node| node.kind() == "string")
            .ok_or_else(|| {
                NotebookError::MalformedDocument(format!(
                    "cell {index} is missing a `cell_type` string"
                ))
            })?;

        let source_range = string_body_range(source_node);
        let Unescaped { adjustments, text: logical } =
            escape::unescape_fragment(&text[source_range.clone()])?;
        let cell_type = CellType::from(string_body_text(type_node, &text)?);
        let id = cell_id_from_node(cell_node, &text);

        spans.push(CellSpan {
            id,
            index,
            cell_type,
            source_range,
            escapes: adjustments,
            logical_len: logical.len(),
        });
    }

    Ok(spans)
}

/// Find the value node of an object member by key, wherever it appears.
fn find_member<'a>(
    object: tree_sitter::Node<'a>,
    key: &str,
    text: &str,
) -> Option<tree_sitter::Node<'a>> {
    let mut cursor = object.walk();
    for pair in object.named_children(&mut cursor) {
        if pair.kind() != "pair" {
            continue;
        }
        let key_node = pair.child_by_field_name("key")?;
        if key_node.kind() != "string" {
            continue;
        }
        // Notebook keys are plain identifiers; comparing the raw body is
        // enough without unescaping.
        let body = string_body_range(key_node);
        if &text[body] == key {
            return pair.child_by_field_name("value");
        }
    }
    None
}

/// Byte range of a string node's body, excluding the quote characters.
fn string_body_range(node: tree_sitter::Node) -> std::ops::Range<usize> {
    let range = node.byte_range();
    (range.start + 1)..(range.end - 1)
}

/// Decode the logical text of a string node.
fn string_body_text(node: tree_sitter::Node, text: &str) -> Result<String, NotebookError> {
    let body = string_body_range(node);
    Ok(escape::unescape_fragment(&text[body])?.text)
}

/// Reuse the cell's own `id` member when present and well-formed, otherwise
/// mint a fresh handle.
fn cell_id_from_node(cell_node: tree_sitter::Node, text: &str) -> CellId {
    let declared = find_member(cell_node, "id", text)
        .filter(|node| node.kind() == "string")
        .and_then(|node| Uuid::parse_str(&text[string_body_range(node)]).ok());
    CellId(declared.unwrap_or_else(Uuid::new_v4))
}

/// Transform all spans through a delta so they track the edited document.
///
/// Span starts keep `after = false` and ends keep `after = true`: text
/// inserted at either boundary of a source range belongs to that cell, so
/// the range absorbs it rather than sliding past it.
pub(crate) fn transform_spans(spans: &mut [CellSpan], delta: &Delta<RopeInfo>, doc_len: usize) {
    let mut transformer = Transformer::new(delta);
    for span in spans.iter_mut() {
        let new_start = transformer.transform(span.source_range.start, false);
        let new_end = transformer.transform(span.source_range.end, true);

        let start = new_start.min(doc_len);
        let end = new_end.min(doc_len).max(start);
        span.source_range = start..end;
    }
}

/// Re-derive the escape table for one span after its literal changed.
/// Fails if the updated range no longer holds a valid literal body, in which
/// case the caller must fall back to a full re-parse.
pub(crate) fn rederive_span_escapes(
    span: &mut CellSpan,
    text: &str,
) -> Result<(), NotebookError> {
    let raw = text
        .get(span.source_range.clone())
        .ok_or_else(|| NotebookError::MalformedDocument("cell span out of bounds".to_string()))?;
    let Unescaped { adjustments, text: logical } = escape::unescape_fragment(raw)?;
    span.escapes = adjustments;
    span.logical_len = logical.len();
    Ok(())
}
