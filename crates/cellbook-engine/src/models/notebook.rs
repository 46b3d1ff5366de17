use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::editing::CellType;

/// Structured notebook model for validation and authoring.
///
/// The editing engine works on raw bytes and never round-trips through this
/// model, so unknown keys and formatting survive edits untouched. This model
/// is for the cases where structure matters: validating a directory of
/// notebooks, or writing a fresh file from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<NotebookCell>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default = "default_nbformat")]
    pub nbformat: u32,
    #[serde(default)]
    pub nbformat_minor: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookCell {
    pub cell_type: CellType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_nbformat() -> u32 {
    4
}

impl Notebook {
    /// Create an empty notebook with current format defaults.
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: default_nbformat(),
            nbformat_minor: 0,
            extra: Map::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn push_cell(&mut self, cell_type: CellType, source: impl Into<String>) {
        self.cells.push(NotebookCell {
            cell_type,
            source: source.into(),
            id: None,
            metadata: Map::new(),
            extra: Map::new(),
        });
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}
