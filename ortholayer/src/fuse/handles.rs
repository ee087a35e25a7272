//! Open file handles for passthrough files.

use crate::fuse::error::FsError;
use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned for every open generated texture.
pub const VIRTUAL_HANDLE: u64 = 0;

/// Table of host files opened through the mount.
///
/// Handles start at 1; 0 is reserved for generated textures.
#[derive(Debug)]
pub struct HandleTable {
    next: AtomicU64,
    files: Mutex<HashMap<u64, Arc<File>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(VIRTUAL_HANDLE + 1),
            files: Mutex::new(HashMap::new()),
        }
    }

    fn files(&self) -> MutexGuard<'_, HashMap<u64, Arc<File>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, file: File) -> u64 {
        let fh = self.next.fetch_add(1, Ordering::Relaxed);
        self.files().insert(fh, Arc::new(file));
        fh
    }

    pub fn get(&self, fh: u64) -> Result<Arc<File>, FsError> {
        self.files().get(&fh).cloned().ok_or(FsError::BadHandle(fh))
    }

    /// Forget `fh`. The file closes once in-progress operations finish.
    pub fn remove(&self, fh: u64) -> Result<(), FsError> {
        self.files()
            .remove(&fh)
            .map(drop)
            .ok_or(FsError::BadHandle(fh))
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
