//! Inode numbers for mount-relative paths.
//!
//! The kernel addresses files by inode; the dispatch layer works on paths.
//! Inodes are handed out on first lookup and never reused while mounted.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The FUSE root inode.
pub const ROOT_INODE: u64 = 1;

#[derive(Debug)]
struct Maps {
    by_ino: HashMap<u64, PathBuf>,
    by_path: HashMap<PathBuf, u64>,
    next: u64,
}

/// Thread-safe bidirectional inode/path map.
#[derive(Debug)]
pub struct InodeTable {
    maps: Mutex<Maps>,
}

impl InodeTable {
    /// A table holding only the root (`/`).
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        let mut by_ino = HashMap::new();
        let mut by_path = HashMap::new();
        by_ino.insert(ROOT_INODE, root.clone());
        by_path.insert(root, ROOT_INODE);

        Self {
            maps: Mutex::new(Maps {
                by_ino,
                by_path,
                next: ROOT_INODE + 1,
            }),
        }
    }

    fn maps(&self) -> MutexGuard<'_, Maps> {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inode for `path`, allocating one if needed.
    pub fn get_or_insert(&self, path: &Path) -> u64 {
        let mut maps = self.maps();
        if let Some(&ino) = maps.by_path.get(path) {
            return ino;
        }
        let ino = maps.next;
        maps.next += 1;
        maps.by_path.insert(path.to_path_buf(), ino);
        maps.by_ino.insert(ino, path.to_path_buf());
        ino
    }

    pub fn path(&self, ino: u64) -> Option<PathBuf> {
        self.maps().by_ino.get(&ino).cloned()
    }

    /// Path of `name` inside directory `parent`.
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.path(parent).map(|dir| dir.join(name))
    }

    /// Forget `path`. Its inode stays unused.
    pub fn remove(&self, path: &Path) {
        let mut maps = self.maps();
        if let Some(ino) = maps.by_path.remove(path) {
            maps.by_ino.remove(&ino);
        }
    }

    /// Move `from` and everything below it to `to`.
    ///
    /// Any inode previously known for `to` is dropped, as the host rename
    /// replaced that file.
    pub fn rename(&self, from: &Path, to: &Path) {
        let mut maps = self.maps();
        if let Some(ino) = maps.by_path.remove(to) {
            maps.by_ino.remove(&ino);
        }

        let moved: Vec<(PathBuf, u64)> = maps
            .by_path
            .iter()
            .filter(|(path, _)| path.starts_with(from))
            .map(|(path, &ino)| (path.clone(), ino))
            .collect();

        for (old, ino) in moved {
            maps.by_path.remove(&old);
            let new = match old.strip_prefix(from) {
                Ok(rest) if rest.as_os_str().is_empty() => to.to_path_buf(),
                Ok(rest) => to.join(rest),
                Err(_) => continue,
            };
            maps.by_path.insert(new.clone(), ino);
            maps.by_ino.insert(ino, new);
        }
    }

    pub fn len(&self) -> usize {
        self.maps().by_ino.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
