use tree_sitter::{Parser, Tree};
use tree_sitter_json::LANGUAGE;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{CellId, CellSpan, Cmd, NotebookError, Patch, cells};

/// Validity of the cell span cache.
///
/// A document is either *parsed* (spans valid) or *unparsed* (spans stale or
/// the document was found malformed). Any edit not proven safe to shift
/// incrementally moves the document back to unparsed; the next span access
/// triggers a full extraction. No partial invalidation is attempted — the
/// documents are small enough that a full pass is cheap.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SpanCache {
    Stale,
    Valid(Vec<CellSpan>),
    /// The last extraction failed; the document behaves as having zero cells
    /// and remains editable as raw text.
    Malformed(String),
}

/// Core notebook document model.
///
/// Holds the raw notebook text in a single `xi_rope::Rope` buffer (exact
/// byte round-trip), an incrementally maintained Tree-sitter JSON parse
/// tree, and the cell span cache derived from it. All edits flow through
/// [`Document::apply`]:
///
/// 1. The command compiles to an xi-rope `Delta`
/// 2. The delta is fed to `tree.edit()` *before* the buffer changes, since
///    Tree-sitter needs old-buffer coordinates
/// 3. The delta is applied to the buffer and the tree re-parsed incrementally
/// 4. Cell spans are shifted through the delta (tracked edits) or the cache
///    is invalidated (out-of-band edits)
///
/// ```rust
/// use cellbook_engine::editing::{Cmd, Document};
///
/// let text = br#"{"cells": [{"cell_type": "code", "source": "print(1)"}]}"#;
/// let mut doc = Document::from_bytes(text).unwrap();
///
/// // Replace `1` with `42` in the first cell's source.
/// doc.apply(Cmd::ReplaceCellText { cell: 0, range: 6..7, text: "42".into() }).unwrap();
///
/// let snapshot = doc.snapshot();
/// assert_eq!(snapshot.cells[0].source, "print(42)");
/// ```
pub struct Document {
    /// Rope buffer containing the entire document as UTF-8 bytes.
    pub(crate) buffer: Rope,
    /// Version counter incremented on each edit (enables change detection).
    pub(crate) version: u64,
    /// Tree-sitter parser configured with the JSON grammar.
    pub(crate) parser: Parser,
    /// Current parse tree (None until first parse, updated incrementally).
    pub(crate) tree: Option<Tree>,
    /// Cell span cache; see [`SpanCache`].
    pub(crate) spans: SpanCache,
}

impl Document {
    /// Create a new document from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);

        let mut parser = Parser::new();
        parser.set_language(&LANGUAGE.into())?;
        let tree = parser.parse(buffer.to_string(), None);

        Ok(Self {
            buffer,
            version: 0,
            parser,
            tree,
            spans: SpanCache::Stale,
        })
    }

    /// Get the document's content as raw bytes (exact round-trip).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Get the current text content.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Get the current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Slice the buffer to a cow string, clamped to document bounds.
    pub(crate) fn slice_to_cow(&self, range: std::ops::Range<usize>) -> std::borrow::Cow<'_, str> {
        let doc_len = self.buffer.len();
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);
        self.buffer.slice_to_cow(start..end)
    }

    /// The tracked cell spans, re-extracted on demand.
    ///
    /// A document that fails to parse behaves as a notebook with zero cells;
    /// the failure is retained and queryable via [`Document::malformed_reason`].
    pub fn cells(&mut self) -> &[CellSpan] {
        self.ensure_spans();
        match &self.spans {
            SpanCache::Valid(spans) => spans,
            _ => &[],
        }
    }

    /// Why the last span extraction failed, if it did.
    pub fn malformed_reason(&mut self) -> Option<&str> {
        self.ensure_spans();
        match &self.spans {
            SpanCache::Malformed(reason) => Some(reason),
            _ => None,
        }
    }

    fn ensure_spans(&mut self) {
        if matches!(self.spans, SpanCache::Stale) {
            self.spans = match cells::extract_cell_spans(self) {
                Ok(spans) => SpanCache::Valid(spans),
                Err(err) => SpanCache::Malformed(err.to_string()),
            };
        }
    }

    /// Apply a command to the document.
    ///
    /// Returns a [`Patch`] describing the changed ranges and new version, or
    /// an error if the command could not be translated (bad cell index or
    /// range, or an escaping failure). On error the document is unchanged.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, NotebookError> {
        if matches!(cmd, Cmd::ReplaceCellText { .. }) {
            self.ensure_spans();
        }
        let delta = self.compile_command(&cmd)?;

        // Track inserted ranges for the patch.
        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                xi_rope::delta::DeltaElement::Copy(_from, to) => {
                    cursor = *to;
                }
                xi_rope::delta::DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    let end = cursor + inserted.len();
                    changed.push(start..end);
                    cursor = end;
                }
            }
        }

        // Compute the tree edit before touching the buffer: Tree-sitter needs
        // old-buffer coordinates to transform its nodes. Every command
        // compiles to one contiguous change; a delta with more than one
        // (which tree.edit cannot take without coordinate reshuffling) skips
        // tree reuse and forces a full parse.
        let edits = match &self.tree {
            Some(_) => self.delta_to_input_edits(&delta),
            None => Vec::new(),
        };
        self.buffer = delta.apply(&self.buffer);
        match (self.tree.take(), edits.as_slice()) {
            (Some(mut old_tree), [edit]) => {
                old_tree.edit(edit);
                self.tree = self.parser.parse(self.buffer.to_string(), Some(&old_tree));
            }
            _ => {
                self.tree = self.parser.parse(self.buffer.to_string(), None);
            }
        }

        self.update_spans_for_command(&cmd, &delta);
        self.version += 1;

        Ok(Patch {
            changed,
            version: self.version,
        })
    }

    /// Maintain the span cache after an applied command. A cell-text replace
    /// shifts every span through the delta and re-derives the edited cell's
    /// escape table; anything else invalidates the cache wholesale.
    fn update_spans_for_command(&mut self, cmd: &Cmd, delta: &Delta<RopeInfo>) {
        let Cmd::ReplaceCellText { cell, .. } = cmd else {
            self.spans = SpanCache::Stale;
            return;
        };

        let doc_len = self.buffer.len();
        let SpanCache::Valid(ref mut spans) = self.spans else {
            self.spans = SpanCache::Stale;
            return;
        };

        cells::transform_spans(spans, delta, doc_len);

        let text = self.buffer.to_string();
        let rederived = spans
            .get_mut(*cell)
            .map(|span| cells::rederive_span_escapes(span, &text));
        if !matches!(rederived, Some(Ok(()))) {
            self.spans = SpanCache::Stale;
        }
    }

    pub(crate) fn compile_command(&self, cmd: &Cmd) -> Result<Delta<RopeInfo>, NotebookError> {
        crate::editing::commands::compile_command(self, cmd)
    }

    pub(crate) fn current_spans(&self) -> &[CellSpan] {
        match &self.spans {
            SpanCache::Valid(spans) => spans,
            _ => &[],
        }
    }

    /// Hit-testing helper: find which cell contains the given document byte
    /// offset, returning its id and the logical offset within its source.
    pub fn locate_in_cell(&mut self, document_offset: usize) -> Option<(CellId, usize)> {
        self.ensure_spans();
        self.current_spans()
            .iter()
            .find(|span| span.contains_document_offset(document_offset))
            .map(|span| (span.id, span.to_local_offset(document_offset)))
    }

    pub fn snapshot(&mut self) -> crate::editing::Snapshot {
        crate::editing::snapshot::create_snapshot(self)
    }

    /// Convert an xi-rope delta into Tree-sitter `InputEdit`s.
    ///
    /// Adjacent insertions and deletions at the same old position merge into
    /// a single replace edit, so the one-region deltas produced by command
    /// compilation always yield exactly one `InputEdit`. Must be called
    /// before the delta is applied to the buffer: all edit coordinates are
    /// expressed against the old document.
    fn delta_to_input_edits(&self, delta: &Delta<RopeInfo>) -> Vec<tree_sitter::InputEdit> {
        // (old_start, old_end, inserted text) per contiguous change.
        fn record(changes: &mut Vec<(usize, usize, String)>, start: usize, end: usize, ins: &str) {
            match changes.last_mut() {
                Some(last) if last.1 == start => {
                    last.1 = end;
                    last.2.push_str(ins);
                }
                _ => changes.push((start, end, ins.to_string())),
            }
        }

        let mut changes: Vec<(usize, usize, String)> = Vec::new();
        let mut old_pos = 0;

        for op in &delta.els {
            match op {
                xi_rope::delta::DeltaElement::Copy(from, to) => {
                    // A gap before the copy is a deletion.
                    if old_pos < *from {
                        record(&mut changes, old_pos, *from, "");
                    }
                    old_pos = *to;
                }
                xi_rope::delta::DeltaElement::Insert(text) => {
                    record(&mut changes, old_pos, old_pos, &text.to_string());
                }
            }
        }

        // Trailing deletion if the old document extends past the last copy.
        if old_pos < delta.base_len {
            record(&mut changes, old_pos, delta.base_len, "");
        }

        let old_text = self.buffer.to_string();
        changes
            .iter()
            .map(|(start, old_end, inserted)| {
                replace_input_edit(&old_text, *start, *old_end, inserted)
            })
            .collect()
    }
}

/// Build an `InputEdit` replacing old bytes `start..old_end` with `inserted`.
fn replace_input_edit(
    old_text: &str,
    start: usize,
    old_end: usize,
    inserted: &str,
) -> tree_sitter::InputEdit {
    let start_pos = byte_to_point(old_text, start);
    let old_end_pos = byte_to_point(old_text, old_end);
    let rel_end = byte_to_point(inserted, inserted.len());
    let new_end_pos = if rel_end.row == 0 {
        tree_sitter::Point {
            row: start_pos.row,
            column: start_pos.column + inserted.len(),
        }
    } else {
        tree_sitter::Point {
            row: start_pos.row + rel_end.row,
            column: rel_end.column,
        }
    };

    tree_sitter::InputEdit {
        start_byte: start,
        old_end_byte: old_end,
        new_end_byte: start + inserted.len(),
        start_position: start_pos,
        old_end_position: old_end_pos,
        new_end_position: new_end_pos,
    }
}

/// Convert a byte offset to a (row, column) point in the given text.
fn byte_to_point(text: &str, byte_offset: usize) -> tree_sitter::Point {
    let bytes = text.as_bytes();
    let offset = byte_offset.min(bytes.len());

    let mut row = 0;
    let mut last_newline = 0;
    for (i, &byte) in bytes.iter().enumerate().take(offset) {
        if byte == b'\n' {
            row += 1;
            last_newline = i + 1;
        }
    }

    tree_sitter::Point {
        row,
        column: offset - last_newline,
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        // Parser does not implement Clone; re-parse for the cloned document.
        let mut parser = Parser::new();
        let _ = parser.set_language(&LANGUAGE.into());
        let tree = parser.parse(self.buffer.to_string(), None);

        Self {
            buffer: self.buffer.clone(),
            version: self.version,
            parser,
            tree,
            spans: self.spans.clone(),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // Parser and tree are derived from the buffer and not compared.
        self.buffer.to_string() == other.buffer.to_string() && self.version == other.version
    }
}
