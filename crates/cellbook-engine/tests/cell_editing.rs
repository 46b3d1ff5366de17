//! End-to-end tests for notebook parsing, cell span tracking, and cell-local
//! editing through the public API.

use cellbook_engine::{Cmd, Document, NotebookError};
use pretty_assertions::assert_eq;

const EXAMPLE: &str =
    r#"{"cells":[{"cell_type":"code","source":"print(1)","metadata":{"language":"python"}}]}"#;

fn multi_cell_notebook() -> String {
    r##"{
  "cells": [
    {"cell_type": "markdown", "source": "# Analysis"},
    {"cell_type": "code", "source": "import math"},
    {"cell_type": "code", "source": "print(math.pi)"}
  ],
  "nbformat": 4,
  "nbformat_minor": 5
}"##
    .to_string()
}

#[test]
fn spans_are_ordered_and_non_overlapping() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

    let cells = doc.cells().to_vec();
    assert_eq!(cells.len(), 3);

    for (i, span) in cells.iter().enumerate() {
        assert_eq!(span.index, i);
        assert!(span.source_range.end <= text.len());
        if i > 0 {
            assert!(cells[i - 1].source_range.end <= span.source_range.start);
        }
    }
}

#[test]
fn span_slices_match_source_literals() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

    let sources: Vec<String> = doc
        .cells()
        .to_vec()
        .iter()
        .map(|s| text[s.source_range.clone()].to_string())
        .collect();

    assert_eq!(sources, vec!["# Analysis", "import math", "print(math.pi)"]);
}

#[test]
fn serialize_preserves_exact_bytes() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

    // Parsing must not normalize whitespace, key order, or formatting
    doc.cells();
    assert_eq!(doc.to_bytes(), text.as_bytes());
}

#[test]
fn example_notebook_parses_and_slices() {
    let mut doc = Document::from_bytes(EXAMPLE.as_bytes()).unwrap();

    let cells = doc.cells().to_vec();
    assert_eq!(cells.len(), 1);
    assert_eq!(&EXAMPLE[cells[0].source_range.clone()], "print(1)");
}

#[test]
fn single_char_edit_shifts_later_spans_by_one() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();
    let before = doc.cells().to_vec();

    // Insert one non-escaping character at the start of the second cell
    doc.apply(Cmd::ReplaceCellText {
        cell: 1,
        range: 0..0,
        text: "x".to_string(),
    })
    .unwrap();

    let after = doc.cells().to_vec();
    assert_eq!(after[0].source_range, before[0].source_range);
    assert_eq!(after[1].source_range.start, before[1].source_range.start);
    assert_eq!(after[1].source_range.end, before[1].source_range.end + 1);
    assert_eq!(
        after[2].source_range.start,
        before[2].source_range.start + 1
    );
    assert_eq!(after[2].source_range.end, before[2].source_range.end + 1);
}

#[test]
fn newline_edit_shifts_by_escaped_width() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();
    let before = doc.cells().to_vec();

    // "\n" escapes to two bytes in the literal
    doc.apply(Cmd::ReplaceCellText {
        cell: 1,
        range: 11..11,
        text: "\n".to_string(),
    })
    .unwrap();

    let after = doc.cells().to_vec();
    assert_eq!(after[1].source_range.end, before[1].source_range.end + 2);
    assert_eq!(
        after[2].source_range.start,
        before[2].source_range.start + 2
    );

    assert_eq!(doc.snapshot().cells[1].source, "import math\n");
}

#[test]
fn tracked_spans_match_fresh_parse_after_edits() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

    doc.apply(Cmd::ReplaceCellText {
        cell: 0,
        range: 2..10,
        text: "Results".to_string(),
    })
    .unwrap();
    doc.apply(Cmd::ReplaceCellText {
        cell: 2,
        range: 0..0,
        text: "value = math.e\n".to_string(),
    })
    .unwrap();

    let tracked: Vec<_> = doc
        .cells()
        .to_vec()
        .iter()
        .map(|s| (s.source_range.clone(), s.logical_len))
        .collect();

    let mut fresh = Document::from_bytes(&doc.to_bytes()).unwrap();
    let reparsed: Vec<_> = fresh
        .cells()
        .to_vec()
        .iter()
        .map(|s| (s.source_range.clone(), s.logical_len))
        .collect();

    assert_eq!(tracked, reparsed);
}

#[test]
fn edited_document_stays_valid_json() {
    let text = multi_cell_notebook();
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

    doc.apply(Cmd::ReplaceCellText {
        cell: 2,
        range: 0..14,
        text: "print(\"tab\\here\")\n".to_string(),
    })
    .unwrap();

    let out = String::from_utf8(doc.to_bytes()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        value["cells"][2]["source"],
        serde_json::json!("print(\"tab\\here\")\n")
    );
}

#[test]
fn serialized_notebook_model_parses_back() {
    use cellbook_engine::editing::CellType;
    use cellbook_engine::models::Notebook;

    let mut notebook = Notebook::new();
    notebook.push_cell(CellType::Markdown, "# Report");
    notebook.push_cell(CellType::Code, "x = 1\nprint(x)");

    let json = notebook.to_pretty_json().unwrap();
    let mut doc = Document::from_bytes(json.as_bytes()).unwrap();

    let snapshot = doc.snapshot();
    assert_eq!(snapshot.cells.len(), 2);
    assert_eq!(snapshot.cells[0].cell_type, CellType::Markdown);
    assert_eq!(snapshot.cells[0].source, "# Report");
    assert_eq!(snapshot.cells[1].source, "x = 1\nprint(x)");
}

#[test]
fn malformed_document_degrades_to_zero_cells() {
    let text = r#"{"foo": 1}"#;
    let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

    assert!(doc.cells().is_empty());
    assert!(doc.malformed_reason().is_some());
    // Raw bytes are still held and serialized exactly
    assert_eq!(doc.to_bytes(), text.as_bytes());
}

#[test]
fn cell_edit_on_malformed_document_is_rejected() {
    let mut doc = Document::from_bytes(b"not json at all").unwrap();

    let err = doc
        .apply(Cmd::ReplaceCellText {
            cell: 0,
            range: 0..0,
            text: "x".to_string(),
        })
        .unwrap_err();

    assert_eq!(err, NotebookError::InvalidCellIndex { index: 0, count: 0 });
}

#[test]
fn raw_edits_still_work_on_malformed_documents() {
    let mut doc = Document::from_bytes(b"not json at all").unwrap();

    doc.apply(Cmd::ReplaceRange {
        range: 0..8,
        text: "still".to_string(),
    })
    .unwrap();

    assert_eq!(doc.text(), "still at all");
}

#[test]
fn raw_edit_repairing_document_restores_cells() {
    let broken = r#"{"cells":[{"cell_type":"code","source":"print(1)"}"#;
    let mut doc = Document::from_bytes(broken.as_bytes()).unwrap();
    assert!(doc.cells().is_empty());

    let len = doc.len();
    doc.apply(Cmd::InsertText {
        at: len,
        text: "]}".to_string(),
    })
    .unwrap();

    assert_eq!(doc.cells().len(), 1);
    assert!(doc.malformed_reason().is_none());
}
