use crate::editing::Document;
use crate::models::{FileTree, NOTEBOOK_EXTENSION};
use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid notebooks directory: {0}")]
    InvalidNotebooksDir(String),
    #[error("Invalid notebook: {0}")]
    InvalidNotebook(String),
}

/// Read a notebook file and return its raw content
pub fn read_notebook(relative_path: &RelativePath, notebooks_root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(notebooks_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Read a notebook file and open it as an editable document
pub fn load_document(
    relative_path: &RelativePath,
    notebooks_root: &Path,
) -> Result<Document, IoError> {
    let content = read_notebook(relative_path, notebooks_root)?;
    Document::from_bytes(content.as_bytes()).map_err(|e| IoError::InvalidNotebook(e.to_string()))
}

/// Write content to a notebook file
pub fn write_notebook(
    relative_path: &RelativePath,
    notebooks_root: &Path,
    content: &str,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(notebooks_root);

    // Create parent directories if they don't exist
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Scan for notebook files in the notebooks directory
pub fn scan_notebook_files(notebooks_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !notebooks_root.exists() {
        return Err(IoError::InvalidNotebooksDir(
            "notebooks directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(notebooks_root, &mut files)?;
    files.sort();
    Ok(files)
}

/// Build a file tree from notebook files in the notebooks directory
pub fn build_file_tree(notebooks_root: &Path) -> Result<FileTree, IoError> {
    if !notebooks_root.exists() {
        return Err(IoError::InvalidNotebooksDir(
            "notebooks directory not found".to_string(),
        ));
    }

    let files = scan_notebook_files(notebooks_root)?;
    Ok(FileTree::build_from_files(
        notebooks_root.to_path_buf(),
        &files,
    ))
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == NOTEBOOK_EXTENSION
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_notebooks_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidNotebooksDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_notebooks_dir};

    const SIMPLE_NOTEBOOK: &str = r#"{"cells":[{"cell_type":"code","source":"print(1)"}]}"#;

    #[test]
    fn scan_finds_notebook_files() {
        let dir = create_test_notebooks_dir();
        create_test_file(&dir, "one.ipynb", SIMPLE_NOTEBOOK);
        create_test_file(&dir, "two.ipynb", SIMPLE_NOTEBOOK);

        let files = scan_notebook_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.file_name().unwrap() == "one.ipynb"));
        assert!(files.iter().any(|f| f.file_name().unwrap() == "two.ipynb"));
    }

    #[test]
    fn scan_recurses_into_subdirectories() {
        let dir = create_test_notebooks_dir();
        create_test_file(&dir, "root.ipynb", SIMPLE_NOTEBOOK);

        let sub_dir = dir.path().join("subfolder");
        std::fs::create_dir(&sub_dir).unwrap();
        std::fs::write(sub_dir.join("nested.ipynb"), SIMPLE_NOTEBOOK).unwrap();

        let files = scan_notebook_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(
            files
                .iter()
                .any(|f| f.file_name().unwrap() == "nested.ipynb")
        );
    }

    #[test]
    fn scan_ignores_other_file_types() {
        let dir = create_test_notebooks_dir();
        create_test_file(&dir, "notebook.ipynb", SIMPLE_NOTEBOOK);
        create_test_file(&dir, "readme.md", "# Readme");
        create_test_file(&dir, "data.json", "{}");

        let files = scan_notebook_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "notebook.ipynb");
    }

    #[test]
    fn scan_rejects_missing_directory() {
        let result = scan_notebook_files(&PathBuf::from("/this/path/does/not/exist"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("notebooks directory")
        );
    }

    #[test]
    fn read_and_write_round_trip() {
        let dir = create_test_notebooks_dir();
        let relative_path = RelativePath::new("folder/new.ipynb");

        write_notebook(relative_path, dir.path(), SIMPLE_NOTEBOOK).unwrap();
        let content = read_notebook(relative_path, dir.path()).unwrap();
        assert_eq!(content, SIMPLE_NOTEBOOK);
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let dir = create_test_notebooks_dir();
        let result = read_notebook(RelativePath::new("missing.ipynb"), dir.path());
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn load_document_parses_cells() {
        let dir = create_test_notebooks_dir();
        create_test_file(&dir, "nb.ipynb", SIMPLE_NOTEBOOK);

        let mut doc = load_document(RelativePath::new("nb.ipynb"), dir.path()).unwrap();
        let snapshot = doc.snapshot();
        assert_eq!(snapshot.cells.len(), 1);
        assert_eq!(snapshot.cells[0].source, "print(1)");
    }

    #[test]
    fn load_document_rejects_non_utf8() {
        let dir = create_test_notebooks_dir();
        std::fs::write(dir.path().join("bad.ipynb"), [0xff, 0xfe, 0x00]).unwrap();

        let result = load_document(RelativePath::new("bad.ipynb"), dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn build_file_tree_from_notebooks() {
        let dir = create_test_notebooks_dir();
        create_test_file(&dir, "a.ipynb", SIMPLE_NOTEBOOK);
        let sub_dir = dir.path().join("deep");
        std::fs::create_dir(&sub_dir).unwrap();
        std::fs::write(sub_dir.join("b.ipynb"), SIMPLE_NOTEBOOK).unwrap();

        let tree = build_file_tree(dir.path()).unwrap();
        assert_eq!(tree.root.children.len(), 2);
        assert!(tree.root.children.contains_key("a.ipynb"));
        assert!(tree.root.children["deep"].is_folder);
    }

    #[test]
    fn validate_accepts_existing_directory() {
        let dir = create_test_notebooks_dir();
        assert!(validate_notebooks_dir(dir.path()).is_ok());
    }

    #[test]
    fn validate_rejects_missing_directory() {
        let result = validate_notebooks_dir(Path::new("/nonexistent/path"));
        assert!(matches!(result, Err(IoError::InvalidNotebooksDir(_))));
    }
}
