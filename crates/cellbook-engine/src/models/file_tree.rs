use crate::models::NotebookFile;
use relative_path::RelativePathBuf;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Hierarchical view of discovered notebook files for directory browsing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTreeNode {
    pub name: String,
    pub path: PathBuf,
    pub is_folder: bool,
    pub is_expanded: bool,
    pub children: BTreeMap<String, FileTreeNode>,
    /// Set for file nodes, `None` for folders.
    pub notebook_file: Option<NotebookFile>,
}

impl FileTreeNode {
    pub fn new_folder(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            is_folder: true,
            is_expanded: false,
            children: BTreeMap::new(),
            notebook_file: None,
        }
    }

    pub fn new_file(name: String, path: PathBuf, notebook_file: NotebookFile) -> Self {
        Self {
            name,
            path,
            is_folder: false,
            is_expanded: false,
            children: BTreeMap::new(),
            notebook_file: Some(notebook_file),
        }
    }

    pub fn insert_file(
        &mut self,
        relative_path: &Path,
        full_path: PathBuf,
        notebook_file: NotebookFile,
    ) {
        let components: Vec<_> = relative_path.components().collect();
        if components.is_empty() {
            return;
        }

        let first_component = components[0].as_os_str().to_string_lossy().to_string();

        if components.len() == 1 {
            // A file directly in this directory
            self.children.insert(
                first_component.clone(),
                FileTreeNode::new_file(first_component, full_path, notebook_file),
            );
        } else {
            // A folder, recurse
            let remaining_path = relative_path.iter().skip(1).collect::<PathBuf>();
            let folder_path = self.path.join(&first_component);

            self.children
                .entry(first_component.clone())
                .or_insert_with(|| FileTreeNode::new_folder(first_component, folder_path))
                .insert_file(&remaining_path, full_path, notebook_file);
        }
    }

    pub fn toggle_expanded(&mut self, path: &Path) -> bool {
        if self.path == path {
            self.is_expanded = !self.is_expanded;
            return true;
        }

        for child in self.children.values_mut() {
            if child.toggle_expanded(path) {
                return true;
            }
        }
        false
    }

    fn set_expanded(&mut self, path: &Path, expanded: bool) -> bool {
        if self.path == path {
            self.is_expanded = expanded;
            return true;
        }

        for child in self.children.values_mut() {
            if child.set_expanded(path, expanded) {
                return true;
            }
        }
        false
    }

    pub fn get_flattened_items(&self, depth: usize) -> Vec<FileTreeItem> {
        let mut items = Vec::new();

        items.push(FileTreeItem {
            node: self.clone(),
            depth,
        });

        if self.is_expanded {
            // Folders first, then files, both case-insensitive alphabetically
            let mut sorted_children: Vec<_> = self.children.values().collect();
            sorted_children.sort_by(|a, b| match (a.is_folder, b.is_folder) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            });

            for child in sorted_children {
                items.extend(child.get_flattened_items(depth + 1));
            }
        }

        items
    }
}

/// A node paired with its indentation depth, ready for list rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTreeItem {
    pub node: FileTreeNode,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileTree {
    pub root: FileTreeNode,
}

impl FileTree {
    pub fn new(root_path: PathBuf) -> Self {
        let root_name = root_path
            .file_name()
            .unwrap_or_else(|| root_path.as_os_str())
            .to_string_lossy()
            .to_string();

        Self {
            root: FileTreeNode::new_folder(root_name, root_path),
        }
    }

    pub fn build_from_files(root_path: PathBuf, files: &[PathBuf]) -> Self {
        let mut tree = Self::new(root_path.clone());
        tree.root.is_expanded = true; // Root should always be expanded

        for file in files {
            if let Ok(relative_path) = file.strip_prefix(&root_path) {
                let notebook_file =
                    NotebookFile::new(RelativePathBuf::from(relative_path.to_string_lossy().as_ref()));
                tree.root
                    .insert_file(relative_path, file.clone(), notebook_file);
            }
        }

        tree
    }

    pub fn toggle_folder(&mut self, path: &Path) {
        self.root.toggle_expanded(path);
    }

    pub fn expand_folder(&mut self, path: &Path) {
        self.root.set_expanded(path, true);
    }

    pub fn collapse_folder(&mut self, path: &Path) {
        self.root.set_expanded(path, false);
    }

    pub fn get_items(&self) -> Vec<FileTreeItem> {
        self.root.get_flattened_items(0)
    }
}
