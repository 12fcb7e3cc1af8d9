//! Path validation
//!
//! Resolves client supplied paths against the session's virtual working
//! directory. Virtual paths are always absolute, `/`-separated and rooted at
//! the server root; they never climb above it.

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Deepest directory nesting a virtual path may have.
pub const MAX_DIRECTORY_DEPTH: usize = 32;

/// Resolves `target` relative to `current` into a normalized virtual path.
pub fn resolve_virtual_path(current: &str, target: &str) -> Result<String, StorageError> {
    if target.contains('\0') {
        return Err(StorageError::InvalidPath(target.escape_default().to_string()));
    }

    let base = if target.starts_with('/') { "/" } else { current };
    let mut parts: Vec<&str> = Vec::new();

    for component in base.split('/').chain(target.split('/')) {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(StorageError::PathTraversal(target.to_string()));
                }
            }
            name => parts.push(name),
        }
    }

    if parts.len() > MAX_DIRECTORY_DEPTH {
        return Err(StorageError::InvalidPath(target.to_string()));
    }

    Ok(format!("/{}", parts.join("/")))
}

/// Maps a normalized virtual path onto the real filesystem below `root`.
pub fn virtual_to_real_path(root: &Path, virtual_path: &str) -> PathBuf {
    root.join(virtual_path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_and_absolute_targets() {
        assert_eq!(resolve_virtual_path("/", "docs").unwrap(), "/docs");
        assert_eq!(resolve_virtual_path("/docs", "2024/q1").unwrap(), "/docs/2024/q1");
        assert_eq!(resolve_virtual_path("/docs", "/pub").unwrap(), "/pub");
        assert_eq!(resolve_virtual_path("/docs/a", "../b/./c/").unwrap(), "/docs/b/c");
        assert_eq!(resolve_virtual_path("/docs", "..").unwrap(), "/");
    }

    #[test]
    fn test_escaping_root_is_rejected() {
        assert!(matches!(
            resolve_virtual_path("/", "../etc"),
            Err(StorageError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_virtual_path("/a", "/../../b"),
            Err(StorageError::PathTraversal(_))
        ));
    }

    #[test]
    fn test_virtual_to_real() {
        let real = virtual_to_real_path(Path::new("/srv/ftp"), "/docs/readme.txt");
        assert_eq!(real, PathBuf::from("/srv/ftp/docs/readme.txt"));
        assert_eq!(virtual_to_real_path(Path::new("/srv/ftp"), "/"), PathBuf::from("/srv/ftp/"));
    }
}
