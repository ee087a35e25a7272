//! Path-based filesystem operations.
//!
//! [`OrthoFs`] is the heart of the mount. Every operation classifies its
//! path first: generated textures are answered from the tile cache with a
//! fixed attribute record, everything else is re-rooted under the backing
//! directory and handed to the host filesystem.
//!
//! Paths are mount-relative and `/`-prefixed, exactly as the kernel sees
//! them. Inode bookkeeping lives in [`super::filesystem`].

use crate::cache::{TileCache, TileKey};
use crate::fuse::attributes::{file_type_from_std, Attributes, StatFs};
use crate::fuse::error::FsError;
use crate::fuse::filename::{classify, PathKind};
use crate::fuse::handles::{HandleTable, VIRTUAL_HANDLE};
use crate::fuse::path::BackingRoot;
use fuser::FileType;
use std::ffi::{CString, OsString};
use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// One directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub kind: FileType,
}

impl DirEntry {
    fn dot(name: &str) -> Self {
        Self {
            name: OsString::from(name),
            kind: FileType::Directory,
        }
    }
}

/// The dispatch layer.
pub struct OrthoFs {
    root: BackingRoot,
    cache: Arc<TileCache>,
    handles: HandleTable,
    uid: u32,
    gid: u32,
}

impl OrthoFs {
    pub fn new(root: impl Into<PathBuf>, cache: Arc<TileCache>) -> Self {
        Self {
            root: BackingRoot::new(root),
            cache,
            handles: HandleTable::new(),
            uid: 0,
            gid: 0,
        }
    }

    /// Owner reported for generated textures.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// Open passthrough handles.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Cache key if `path` names a generated texture.
    fn virtual_key(&self, path: &Path) -> Option<TileKey> {
        match classify(path) {
            PathKind::Virtual(name) => Some(self.cache.key_for(&name)),
            PathKind::Dsf | PathKind::Terrain(_) | PathKind::Passthrough => None,
        }
    }

    /// Cache key for an open generated texture.
    ///
    /// Host files keep their own handle even if renamed onto a texture
    /// name, so the handle decides, not the current path.
    fn open_virtual_key(&self, path: &Path, fh: u64) -> Option<TileKey> {
        if fh == VIRTUAL_HANDLE {
            self.virtual_key(path)
        } else {
            None
        }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.root.resolve(path)
    }

    pub fn getattr(&self, path: &Path) -> Result<Attributes, FsError> {
        if self.virtual_key(path).is_some() {
            return Ok(Attributes::virtual_texture(self.uid, self.gid));
        }
        let full = self.resolve(path)?;
        let metadata = fs::symlink_metadata(&full).map_err(|e| FsError::from_io(e, path))?;
        Ok(Attributes::from_metadata(&metadata))
    }

    /// Check access with the host's `access(2)` semantics.
    pub fn access(&self, path: &Path, mask: i32) -> Result<(), FsError> {
        if self.virtual_key(path).is_some() {
            return Ok(());
        }
        let full = cstring(&self.resolve(path)?)?;
        // SAFETY: `full` is a valid NUL-terminated string.
        if unsafe { libc::access(full.as_ptr(), mask) } == 0 {
            Ok(())
        } else {
            Err(FsError::PermissionDenied(path.to_path_buf()))
        }
    }

    /// List a directory.
    ///
    /// Always starts with `.` and `..`. A path that is not a directory on
    /// the host lists only those two.
    pub fn readdir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let mut entries = vec![DirEntry::dot("."), DirEntry::dot("..")];
        let full = self.resolve(path)?;
        if !full.is_dir() {
            return Ok(entries);
        }

        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            let kind = entry
                .file_type()
                .map(file_type_from_std)
                .unwrap_or(FileType::RegularFile);
            entries.push(DirEntry {
                name: entry.file_name(),
                kind,
            });
        }
        Ok(entries)
    }

    /// Read a symlink. Absolute targets come back relative to the root.
    pub fn readlink(&self, path: &Path) -> Result<PathBuf, FsError> {
        let full = self.resolve(path)?;
        let target = fs::read_link(&full).map_err(|e| FsError::from_io(e, path))?;
        Ok(self.root.relativize(&target))
    }

    pub fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> Result<(), FsError> {
        let full = cstring(&self.resolve(path)?)?;
        // SAFETY: `full` is a valid NUL-terminated string.
        let rc = unsafe { libc::mknod(full.as_ptr(), mode as libc::mode_t, rdev as libc::dev_t) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error().into())
        }
    }

    pub fn mkdir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        DirBuilder::new().mode(mode).create(full)?;
        Ok(())
    }

    pub fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        fs::remove_dir(full).map_err(|e| FsError::from_io(e, path))
    }

    pub fn unlink(&self, path: &Path) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        fs::remove_file(full).map_err(|e| FsError::from_io(e, path))
    }

    /// Create a symlink at `path` pointing at `target`. The target is
    /// stored verbatim.
    pub fn symlink(&self, path: &Path, target: &Path) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        std::os::unix::fs::symlink(target, full)?;
        Ok(())
    }

    pub fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let old = self.resolve(from)?;
        let new = self.resolve(to)?;
        fs::rename(old, new).map_err(|e| FsError::from_io(e, from))
    }

    /// Create a hard link at `new_link` to the existing `existing`.
    pub fn link(&self, existing: &Path, new_link: &Path) -> Result<(), FsError> {
        let source = self.resolve(existing)?;
        let dest = self.resolve(new_link)?;
        fs::hard_link(source, dest).map_err(|e| FsError::from_io(e, existing))
    }

    pub fn chmod(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        fs::set_permissions(full, Permissions::from_mode(mode))
            .map_err(|e| FsError::from_io(e, path))
    }

    /// Change ownership. `None` leaves that id unchanged.
    pub fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        std::os::unix::fs::chown(full, uid, gid).map_err(|e| FsError::from_io(e, path))
    }

    /// Set access and modification times. `None` leaves that time unchanged.
    pub fn utimens(
        &self,
        path: &Path,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> Result<(), FsError> {
        let full = cstring(&self.resolve(path)?)?;
        let times = [timespec(atime), timespec(mtime)];
        // SAFETY: `full` is NUL-terminated and `times` holds two entries.
        let rc = unsafe { libc::utimensat(libc::AT_FDCWD, full.as_ptr(), times.as_ptr(), 0) };
        if rc == 0 {
            Ok(())
        } else {
            Err(FsError::from_io(io::Error::last_os_error(), path))
        }
    }

    /// Statistics of the filesystem holding the backing directory.
    ///
    /// Falls back to a fixed record when the host does not implement
    /// `statvfs`.
    pub fn statfs(&self, path: &Path) -> Result<StatFs, FsError> {
        let full = cstring(&self.resolve(path)?)?;
        let mut st = std::mem::MaybeUninit::<libc::statvfs>::zeroed();
        // SAFETY: `full` is NUL-terminated and `st` is large enough.
        let rc = unsafe { libc::statvfs(full.as_ptr(), st.as_mut_ptr()) };
        if rc == 0 {
            // SAFETY: statvfs filled the struct on success.
            return Ok(StatFs::from_statvfs(unsafe { &st.assume_init() }));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOSYS) {
            debug!("statvfs unsupported, reporting synthetic statistics");
            return Ok(StatFs::synthetic());
        }
        Err(FsError::from_io(err, path))
    }

    /// Open a file and return its handle.
    ///
    /// Generated textures take a reference on their tile and share
    /// [`VIRTUAL_HANDLE`]; the tile is produced here if it is not cached.
    pub fn open(&self, path: &Path, flags: i32) -> Result<u64, FsError> {
        if let Some(key) = self.virtual_key(path) {
            debug!(path = %path.display(), tile = %key, "open virtual");
            self.cache.acquire(&key)?;
            return Ok(VIRTUAL_HANDLE);
        }

        let full = self.resolve(path)?;
        let file = open_options(flags)
            .open(&full)
            .map_err(|e| FsError::from_io(e, path))?;
        Ok(self.handles.insert(file))
    }

    /// Create and open a host file.
    pub fn create(&self, path: &Path, mode: u32, flags: i32) -> Result<u64, FsError> {
        let full = self.resolve(path)?;
        let flags = if flags & libc::O_ACCMODE == libc::O_RDONLY {
            flags | libc::O_WRONLY
        } else {
            flags
        };
        let file = open_options(flags)
            .create(true)
            .mode(mode)
            .open(&full)
            .map_err(|e| FsError::from_io(e, path))?;
        Ok(self.handles.insert(file))
    }

    /// Read up to `size` bytes at `offset`.
    ///
    /// Short only at end of file; empty at or past it.
    pub fn read(&self, path: &Path, fh: u64, offset: u64, size: u32) -> Result<Vec<u8>, FsError> {
        if let Some(key) = self.open_virtual_key(path, fh) {
            trace!(tile = %key, offset, size, "read virtual");
            let lease = self.cache.lease(&key)?;
            return Ok(lease.read(offset, size as usize)?);
        }

        let file = self.handles.get(fh)?;
        let mut buf = vec![0u8; size as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Write `data` at `offset`, returning the number of bytes accepted.
    ///
    /// Writes to generated textures are accepted and discarded.
    pub fn write(&self, path: &Path, fh: u64, offset: u64, data: &[u8]) -> Result<u32, FsError> {
        if self.open_virtual_key(path, fh).is_some() {
            return Ok(data.len() as u32);
        }
        let file = self.handles.get(fh)?;
        file.write_all_at(data, offset)?;
        Ok(data.len() as u32)
    }

    /// Truncate a host file. Generated textures ignore it.
    pub fn truncate(&self, path: &Path, size: u64, fh: Option<u64>) -> Result<(), FsError> {
        let handle = fh.filter(|fh| *fh != VIRTUAL_HANDLE);
        if let Some(file) = handle.and_then(|fh| self.handles.get(fh).ok()) {
            file.set_len(size)?;
            return Ok(());
        }
        if self.virtual_key(path).is_some() {
            return Ok(());
        }
        let full = self.resolve(path)?;
        let file = OpenOptions::new()
            .write(true)
            .open(full)
            .map_err(|e| FsError::from_io(e, path))?;
        file.set_len(size)?;
        Ok(())
    }

    pub fn flush(&self, path: &Path, fh: u64) -> Result<(), FsError> {
        if self.open_virtual_key(path, fh).is_some() {
            return Ok(());
        }
        let file = self.handles.get(fh)?;
        (&*file).flush()?;
        Ok(())
    }

    pub fn fsync(&self, path: &Path, fh: u64, datasync: bool) -> Result<(), FsError> {
        if self.open_virtual_key(path, fh).is_some() {
            return Ok(());
        }
        let file = self.handles.get(fh)?;
        if datasync {
            file.sync_data()?;
        } else {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Close a handle. Generated textures drop their tile reference.
    pub fn release(&self, path: &Path, fh: u64) -> Result<(), FsError> {
        if let Some(key) = self.open_virtual_key(path, fh) {
            debug!(path = %path.display(), tile = %key, "release virtual");
            self.cache.release(&key);
            return Ok(());
        }
        self.handles.remove(fh)
    }

    pub fn releasedir(&self, _path: &Path, _fh: u64) -> Result<(), FsError> {
        Ok(())
    }

    pub fn close(&self, _path: &Path, _fh: u64) -> Result<(), FsError> {
        Ok(())
    }
}

fn cstring(path: &Path) -> Result<CString, FsError> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| FsError::InvalidArgument(format!("{} contains NUL", path.display())))
}

fn timespec(time: Option<SystemTime>) -> libc::timespec {
    match time {
        Some(time) => {
            let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
            libc::timespec {
                tv_sec: since.as_secs() as libc::time_t,
                tv_nsec: since.subsec_nanos() as _,
            }
        }
        None => libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_OMIT,
        },
    }
}

/// `OpenOptions` equivalent to the open(2) `flags` the kernel passed on.
fn open_options(flags: i32) -> OpenOptions {
    let mut options = OpenOptions::new();
    match flags & libc::O_ACCMODE {
        libc::O_WRONLY => options.write(true),
        libc::O_RDWR => options.read(true).write(true),
        _ => options.read(true),
    };
    options.custom_flags(flags & !(libc::O_ACCMODE | libc::O_CREAT));
    options
}
