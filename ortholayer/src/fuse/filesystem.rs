//! `fuser` adapter for [`OrthoFs`].
//!
//! The kernel speaks inodes; [`OrthoFs`] speaks paths. [`OrthoFuse`] keeps
//! the [`InodeTable`] in step with lookups, creations, renames and removals,
//! and turns every [`FsError`] into an errno reply.
//!
//! Opens, reads and writes may wait on tile generation or slow disks, so
//! they run on a rayon pool and reply from the worker thread. Metadata
//! operations are answered inline.

use crate::fuse::dispatch::OrthoFs;
use crate::fuse::error::FsError;
use crate::fuse::inode::{InodeTable, ROOT_INODE};
use fuser::{
    FileAttr, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Time-to-live for attribute and entry caching.
const TTL: Duration = Duration::from_secs(1);

/// Kernel-facing filesystem.
pub struct OrthoFuse {
    fs: Arc<OrthoFs>,
    inodes: Arc<InodeTable>,
    pool: Option<rayon::ThreadPool>,
}

impl OrthoFuse {
    /// Wrap `fs`, dispatching slow operations on `threads` workers.
    ///
    /// `threads = 0` sizes the pool to the CPU count; `threads = 1` handles
    /// everything inline on the session thread.
    pub fn new(fs: Arc<OrthoFs>, threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = if threads == 1 {
            None
        } else {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("fuse-worker-{}", i))
                    .build()?,
            )
        };

        Ok(Self {
            fs,
            inodes: Arc::new(InodeTable::new()),
            pool,
        })
    }

    pub fn dispatch(&self) -> &Arc<OrthoFs> {
        &self.fs
    }

    /// Worker threads in use, 1 when inline.
    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map(rayon::ThreadPool::current_num_threads)
            .unwrap_or(1)
    }

    fn run<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => job(),
        }
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<PathBuf, FsError> {
        self.inodes
            .child_path(parent, name)
            .ok_or_else(|| FsError::NotFound(PathBuf::from(name)))
    }

    fn path(&self, ino: u64) -> Result<PathBuf, FsError> {
        self.inodes
            .path(ino)
            .ok_or_else(|| FsError::NotFound(PathBuf::from(format!("inode {}", ino))))
    }

    /// Attributes of `path` with a (possibly new) inode.
    fn entry(&self, path: &Path) -> Result<FileAttr, FsError> {
        let attr = self.fs.getattr(path)?;
        let ino = self.inodes.get_or_insert(path);
        Ok(attr.to_file_attr(ino))
    }

    fn apply_setattr(&self, path: &Path, change: SetAttr) -> Result<FileAttr, FsError> {
        if let Some(mode) = change.mode {
            self.fs.chmod(path, mode)?;
        }
        if change.uid.is_some() || change.gid.is_some() {
            self.fs.chown(path, change.uid, change.gid)?;
        }
        if let Some(size) = change.size {
            self.fs.truncate(path, size, change.fh)?;
        }
        if change.atime.is_some() || change.mtime.is_some() {
            self.fs.utimens(
                path,
                change.atime.map(resolve_time),
                change.mtime.map(resolve_time),
            )?;
        }
        self.entry(path)
    }
}

/// The parts of a setattr request the dispatch layer acts on.
struct SetAttr {
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
    fh: Option<u64>,
}

fn resolve_time(time: TimeOrNow) -> SystemTime {
    match time {
        TimeOrNow::SpecificTime(time) => time,
        TimeOrNow::Now => SystemTime::now(),
    }
}

fn offset(offset: i64) -> Result<u64, FsError> {
    u64::try_from(offset).map_err(|_| FsError::InvalidArgument(format!("offset {}", offset)))
}

/// Log at debug and reply with the mapped errno.
macro_rules! fail {
    ($reply:expr, $op:literal, $err:expr) => {{
        let err = $err;
        debug!(op = $op, error = %err, "request failed");
        $reply.error(err.errno());
    }};
}

impl Filesystem for OrthoFuse {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        info!(
            root = %self.fs.root().display(),
            workers = self.workers(),
            "Filesystem mounted"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        let stats = self.fs.cache().stats();
        info!(
            tiles = stats.entries,
            open = stats.open_refs,
            "Filesystem unmounted, releasing cached tiles"
        );
        self.fs.cache().clear();
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.child(parent, name).and_then(|path| self.entry(&path)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => {
                // Misses are routine (the simulator probes for optional files)
                if !matches!(e, FsError::NotFound(_)) {
                    debug!(parent, name = ?name, error = %e, "lookup failed");
                }
                reply.error(e.errno());
            }
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let result = self
            .path(ino)
            .and_then(|path| self.fs.getattr(&path))
            .map(|attr| attr.to_file_attr(ino));
        match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => fail!(reply, "getattr", e),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let change = SetAttr {
            mode,
            uid,
            gid,
            size,
            atime,
            mtime,
            fh,
        };
        match self
            .path(ino)
            .and_then(|path| self.apply_setattr(&path, change))
        {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => fail!(reply, "setattr", e),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        match self.path(ino).and_then(|path| self.fs.readlink(&path)) {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => fail!(reply, "readlink", e),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.mknod(&path, mode & !umask, u64::from(rdev))?;
            self.entry(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => fail!(reply, "mknod", e),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.mkdir(&path, mode & !umask)?;
            self.entry(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => fail!(reply, "mkdir", e),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.unlink(&path)?;
            self.inodes.remove(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "unlink", e),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.rmdir(&path)?;
            self.inodes.remove(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "rmdir", e),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let result = self.child(parent, link_name).and_then(|path| {
            self.fs.symlink(&path, target)?;
            self.entry(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => fail!(reply, "symlink", e),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let result = self.child(parent, name).and_then(|from| {
            let to = self.child(newparent, newname)?;
            self.fs.rename(&from, &to)?;
            self.inodes.rename(&from, &to);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "rename", e),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let result = self.path(ino).and_then(|existing| {
            let new_link = self.child(newparent, newname)?;
            self.fs.link(&existing, &new_link)?;
            self.entry(&new_link)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => fail!(reply, "link", e),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return fail!(reply, "open", e),
        };
        let fs = Arc::clone(&self.fs);
        // A virtual open may have to build the tile
        self.run(move || match fs.open(&path, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => {
                if matches!(e, FsError::Tile(_)) {
                    warn!(path = %path.display(), error = %e, "Tile open failed");
                }
                fail!(reply, "open", e)
            }
        });
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset_in: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let (path, offset) = match self.path(ino).and_then(|p| Ok((p, offset(offset_in)?))) {
            Ok(found) => found,
            Err(e) => return fail!(reply, "read", e),
        };
        let fs = Arc::clone(&self.fs);
        self.run(move || match fs.read(&path, fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                warn!(path = %path.display(), offset, size, error = %e, "Read failed");
                reply.error(e.errno());
            }
        });
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset_in: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let (path, offset) = match self.path(ino).and_then(|p| Ok((p, offset(offset_in)?))) {
            Ok(found) => found,
            Err(e) => return fail!(reply, "write", e),
        };
        let fs = Arc::clone(&self.fs);
        let data = data.to_vec();
        self.run(move || match fs.write(&path, fh, offset, &data) {
            Ok(written) => reply.written(written),
            Err(e) => fail!(reply, "write", e),
        });
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        match self.path(ino).and_then(|path| self.fs.flush(&path, fh)) {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "flush", e),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.path(ino).and_then(|path| self.fs.release(&path, fh)) {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "release", e),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return fail!(reply, "fsync", e),
        };
        let fs = Arc::clone(&self.fs);
        self.run(move || match fs.fsync(&path, fh, datasync) {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "fsync", e),
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return fail!(reply, "readdir", e),
        };
        let entries = match self.fs.readdir(&path) {
            Ok(entries) => entries,
            Err(e) => return fail!(reply, "readdir", e),
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, entry) in entries.iter().enumerate().skip(skip) {
            let child_ino = match entry.name.as_bytes() {
                b"." => ino,
                b".." => match path.parent() {
                    Some(parent) => self.inodes.get_or_insert(parent),
                    None => ROOT_INODE,
                },
                _ => self.inodes.get_or_insert(&path.join(&entry.name)),
            };
            // Buffer full; the kernel asks again from this offset
            if reply.add(child_ino, (i + 1) as i64, entry.kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        match self.path(ino).and_then(|path| self.fs.releasedir(&path, fh)) {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "releasedir", e),
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        let path = self.inodes.path(ino).unwrap_or_else(|| PathBuf::from("/"));
        match self.fs.statfs(&path) {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                st.frsize,
            ),
            Err(e) => fail!(reply, "statfs", e),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        match self.path(ino).and_then(|path| self.fs.access(&path, mask)) {
            Ok(()) => reply.ok(),
            Err(e) => fail!(reply, "access", e),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let result = self.child(parent, name).and_then(|path| {
            let fh = self.fs.create(&path, mode & !umask, flags)?;
            match self.entry(&path) {
                Ok(attr) => Ok((attr, fh)),
                Err(e) => {
                    let _ = self.fs.release(&path, fh);
                    Err(e)
                }
            }
        });
        match result {
            Ok((attr, fh)) => reply.created(&TTL, &attr, 0, fh, 0),
            Err(e) => fail!(reply, "create", e),
        }
    }
}
