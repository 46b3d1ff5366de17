pub mod file_tree;
pub mod notebook;
pub mod notebook_file;

pub use file_tree::*;
pub use notebook::{Notebook, NotebookCell};
pub use notebook_file::{NOTEBOOK_EXTENSION, NotebookFile};
