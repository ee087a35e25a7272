//! Filesystem operation errors and their errno mapping.

use crate::cache::CacheError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error returned by every dispatch operation.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown file handle {0}")]
    BadHandle(u64),

    /// Generated content could not be produced or read
    #[error(transparent)]
    Tile(#[from] CacheError),

    /// Host I/O failure, carrying the native errno when there is one
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// errno to reply with.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::PermissionDenied(_) => libc::EACCES,
            FsError::InvalidArgument(_) => libc::EINVAL,
            FsError::BadHandle(_) => libc::EBADF,
            FsError::Tile(_) => libc::EIO,
            FsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Convert a host I/O error for `path`, naming the path when it is missing.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            FsError::NotFound(path.to_path_buf())
        } else {
            FsError::Io(err)
        }
    }
}
