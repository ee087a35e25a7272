//! File attributes and filesystem statistics.
//!
//! Generated textures never exist on disk, so every one of them reports the
//! same fixed record: the size of a 4096×4096 DXT5 texture with a full mip
//! chain and fixed timestamps, so X-Plane's file cache sees a stable file.

use fuser::{FileAttr, FileType};
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of every generated texture.
pub const VIRTUAL_FILE_SIZE: u64 = 22_369_744;
/// Preferred I/O size reported for generated textures.
pub const VIRTUAL_BLOCK_SIZE: u32 = 32_768;
/// Regular file, rw-rw-r--.
pub const VIRTUAL_MODE: u32 = 0o100664;
pub const VIRTUAL_ATIME: Duration = Duration::new(1_649_857_250, 382_081_000);
/// Used for both ctime and mtime.
pub const VIRTUAL_MTIME: Duration = Duration::new(1_649_857_251, 726_115_000);

/// Attributes of one file, independent of inode numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    pub size: u64,
    pub blocks: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub kind: FileType,
    /// Full `st_mode`, type bits included
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub blksize: u32,
}

impl Attributes {
    /// The fixed record for a generated texture.
    pub fn virtual_texture(uid: u32, gid: u32) -> Self {
        Self {
            size: VIRTUAL_FILE_SIZE,
            blocks: VIRTUAL_FILE_SIZE.div_ceil(512),
            atime: UNIX_EPOCH + VIRTUAL_ATIME,
            mtime: UNIX_EPOCH + VIRTUAL_MTIME,
            ctime: UNIX_EPOCH + VIRTUAL_MTIME,
            kind: FileType::RegularFile,
            mode: VIRTUAL_MODE,
            nlink: 1,
            uid,
            gid,
            rdev: 0,
            blksize: VIRTUAL_BLOCK_SIZE,
        }
    }

    /// Attributes of a host file, from `lstat`.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.size(),
            blocks: metadata.blocks(),
            atime: timestamp(metadata.atime(), metadata.atime_nsec()),
            mtime: timestamp(metadata.mtime(), metadata.mtime_nsec()),
            ctime: timestamp(metadata.ctime(), metadata.ctime_nsec()),
            kind: file_type_from_mode(metadata.mode()),
            mode: metadata.mode(),
            nlink: metadata.nlink() as u32,
            uid: metadata.uid(),
            gid: metadata.gid(),
            rdev: metadata.rdev() as u32,
            blksize: metadata.blksize() as u32,
        }
    }

    /// Permission bits (including setuid/setgid/sticky).
    pub fn perm(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }

    pub fn to_file_attr(&self, ino: u64) -> FileAttr {
        FileAttr {
            ino,
            size: self.size,
            blocks: self.blocks,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            crtime: self.mtime,
            kind: self.kind,
            perm: self.perm(),
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: self.rdev,
            blksize: self.blksize,
            flags: 0,
        }
    }
}

fn timestamp(secs: i64, nsecs: i64) -> SystemTime {
    let nanos = Duration::from_nanos(nsecs.max(0) as u64);
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64) + nanos
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + nanos
    }
}

/// File type encoded in the `S_IFMT` bits of a mode.
pub fn file_type_from_mode(mode: u32) -> FileType {
    match mode & libc::S_IFMT as u32 {
        m if m == libc::S_IFDIR as u32 => FileType::Directory,
        m if m == libc::S_IFLNK as u32 => FileType::Symlink,
        m if m == libc::S_IFIFO as u32 => FileType::NamedPipe,
        m if m == libc::S_IFCHR as u32 => FileType::CharDevice,
        m if m == libc::S_IFBLK as u32 => FileType::BlockDevice,
        m if m == libc::S_IFSOCK as u32 => FileType::Socket,
        _ => FileType::RegularFile,
    }
}

/// File type of a directory entry.
pub fn file_type_from_std(file_type: std::fs::FileType) -> FileType {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_dir() {
        FileType::Directory
    } else if file_type.is_symlink() {
        FileType::Symlink
    } else if file_type.is_fifo() {
        FileType::NamedPipe
    } else if file_type.is_char_device() {
        FileType::CharDevice
    } else if file_type.is_block_device() {
        FileType::BlockDevice
    } else if file_type.is_socket() {
        FileType::Socket
    } else {
        FileType::RegularFile
    }
}

/// Filesystem statistics as reported to `statfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub favail: u64,
    pub bsize: u32,
    pub frsize: u32,
    pub namelen: u32,
    pub flags: u64,
}

impl StatFs {
    /// Fixed record reported when the host cannot answer.
    pub fn synthetic() -> Self {
        Self {
            blocks: 1204,
            bfree: 1024,
            bavail: 1024,
            files: 1024,
            ffree: 1024,
            favail: 1024,
            bsize: 4096,
            frsize: 1024,
            namelen: 1024,
            flags: 0,
        }
    }

    pub fn from_statvfs(st: &libc::statvfs) -> Self {
        Self {
            blocks: st.f_blocks as u64,
            bfree: st.f_bfree as u64,
            bavail: st.f_bavail as u64,
            files: st.f_files as u64,
            ffree: st.f_ffree as u64,
            favail: st.f_favail as u64,
            bsize: st.f_bsize as u32,
            frsize: st.f_frsize as u32,
            namelen: st.f_namemax as u32,
            flags: st.f_flag as u64,
        }
    }
}
