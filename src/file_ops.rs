//! File operations module - Filesystem access for the resize worker
//!
//! This module wraps the handful of blocking filesystem calls the
//! resizer needs behind a small trait, with a local-disk implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Which filesystem call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOperation {
    Read,
    CreateDir,
    Write,
}

impl std::fmt::Display for FsOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FsOperation::Read => "read",
            FsOperation::CreateDir => "create directory",
            FsOperation::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("Failed to {operation} {}: {source}", .path.display())]
pub struct FilesystemError {
    pub operation: FsOperation,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FilesystemError {
    pub fn new(operation: FsOperation, path: &Path, source: io::Error) -> Self {
        Self {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn not_found(path: &Path) -> Self {
        Self::new(
            FsOperation::Read,
            path,
            io::Error::new(io::ErrorKind::NotFound, "file does not exist"),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Blocking filesystem access used by the resize orchestrator
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents. Succeeds if it already exists.
    fn create_dir(&self, path: &Path) -> Result<(), FilesystemError>;

    fn read_all(&self, path: &Path) -> Result<Vec<u8>, FilesystemError>;

    /// Replace the contents of `path` with `bytes`.
    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), FilesystemError>;
}

/// The local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> Result<(), FilesystemError> {
        // Handle the race with another creator directly
        match fs::create_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(FilesystemError::new(FsOperation::CreateDir, path, e)),
        }
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>, FilesystemError> {
        fs::read(path).map_err(|e| FilesystemError::new(FsOperation::Read, path, e))
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), FilesystemError> {
        let temp_path = partial_path(path);

        if let Err(e) = fs::write(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(FilesystemError::new(FsOperation::Write, path, e));
        }

        match fs::rename(&temp_path, path) {
            Ok(()) => {
                log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
                Ok(())
            }
            Err(e) => {
                // Rename failed - clean up the partial file
                let _ = fs::remove_file(&temp_path);
                Err(FilesystemError::new(FsOperation::Write, path, e))
            }
        }
    }
}

/// Sibling path used while a write is in progress
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(".{}.{}.partial", name, Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("imageresizer");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep.txt"), b"unrelated").unwrap();

        LocalFs.create_dir(&dest).unwrap();
        LocalFs.create_dir(&dest).unwrap();

        assert_eq!(fs::read(dest.join("keep.txt")).unwrap(), b"unrelated");
    }

    #[test]
    fn test_create_dir_under_a_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = LocalFs.create_dir(&blocker.join("sub")).unwrap_err();
        assert_eq!(err.operation, FsOperation::CreateDir);
    }

    #[test]
    fn test_read_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LocalFs.read_all(&tmp.path().join("x.png")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation, FsOperation::Read);
    }

    #[test]
    fn test_write_replaces_and_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("photo.png");

        LocalFs.write_all(&target, b"first").unwrap();
        LocalFs.write_all(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
        let entries = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("missing").join("photo.png");

        let err = LocalFs.write_all(&target, b"data").unwrap_err();
        assert_eq!(err.operation, FsOperation::Write);
        assert!(!LocalFs.exists(&target));
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let path = Path::new("/tmp/out/test.png");
        let partial = partial_path(path);
        assert_eq!(partial.parent(), Some(Path::new("/tmp/out")));
        let name = partial.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".test.png."));
        assert!(name.ends_with(".partial"));
    }
}
