//! File system operations
//!
//! The control session never touches the disk directly; it goes through the
//! [`FileSystem`] collaborator using virtual paths. [`LocalFileSystem`] is the
//! default implementation, rooted at the configured server root.

use log::debug;
use std::fs;
use std::path::PathBuf;

use crate::error::StorageError;
use crate::storage::validation::virtual_to_real_path;

/// Filesystem operations the FTP engine depends on.
///
/// All paths are normalized virtual paths such as `/docs/readme.txt`.
pub trait FileSystem: Send + Sync {
    fn path_exists(&self, path: &str) -> bool;

    fn is_directory(&self, path: &str) -> bool;

    /// Creates or truncates `path` and writes `bytes` to it.
    fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Names of the entries in a directory, sorted. Directories carry a trailing `/`.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, StorageError>;
}

/// [`FileSystem`] backed by a directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn real(&self, path: &str) -> PathBuf {
        virtual_to_real_path(&self.root, path)
    }
}

impl FileSystem for LocalFileSystem {
    fn path_exists(&self, path: &str) -> bool {
        self.real(path).exists()
    }

    fn is_directory(&self, path: &str) -> bool {
        self.real(path).is_dir()
    }

    fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let real = self.real(path);
        if real.is_dir() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        fs::write(&real, bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), real.display());
        Ok(())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let real = self.real(path);
        if !real.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(fs::read(real)?)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, StorageError> {
        let real = self.real(path);
        if !real.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(real)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}
