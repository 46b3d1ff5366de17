use relative_path::{RelativePath, RelativePathBuf};

/// File extension notebook documents are stored under.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// A notebook file addressed relative to the notebooks root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotebookFile {
    relative_path: RelativePathBuf,
}

impl NotebookFile {
    pub fn new(relative_path: RelativePathBuf) -> Self {
        Self { relative_path }
    }

    pub fn from_relative_str(path: &str) -> Self {
        Self::new(RelativePathBuf::from(path))
    }

    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    /// Whether the path carries the notebook extension.
    pub fn is_notebook(&self) -> bool {
        self.relative_path.extension() == Some(NOTEBOOK_EXTENSION)
    }

    /// File name with the notebook extension stripped, for list entries.
    pub fn display_name(&self) -> &str {
        strip_notebook_extension(self.relative_path.file_name().unwrap_or("Untitled"))
    }

    /// Relative path with the notebook extension stripped, for titles.
    pub fn display_path(&self) -> &str {
        strip_notebook_extension(self.relative_path.as_str())
    }
}

impl From<RelativePathBuf> for NotebookFile {
    fn from(path: RelativePathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for NotebookFile {
    fn from(path: &str) -> Self {
        Self::from_relative_str(path)
    }
}

fn strip_notebook_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, ext)) if ext == NOTEBOOK_EXTENSION => stem,
        _ => path,
    }
}
