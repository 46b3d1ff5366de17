pub mod editing;
pub mod io;
pub mod models;


// Re-export key types for easier usage
pub use editing::{NotebookError, cells::*, commands::*, document::*, snapshot::*};
pub use io::*;
pub use models::{file_tree::*, notebook::*, notebook_file::*};
