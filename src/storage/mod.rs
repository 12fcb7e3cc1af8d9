//! File system storage
//!
//! The filesystem collaborator and virtual path handling.

pub mod filesystem;
pub mod validation;

pub use filesystem::{FileSystem, LocalFileSystem};
pub use validation::{resolve_virtual_path, virtual_to_real_path};
