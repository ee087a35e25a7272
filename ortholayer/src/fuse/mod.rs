//! Virtual filesystem for on-demand DDS textures.
//!
//! - [`classify`] decides whether a path is a generated texture
//! - [`OrthoFs`] dispatches path-based operations to the tile cache or the
//!   backing directory
//! - [`OrthoFuse`] adapts [`OrthoFs`] to the kernel through `fuser`

mod attributes;
mod dispatch;
mod error;
mod filename;
mod filesystem;
mod handles;
mod inode;
mod mount;
mod path;

pub use attributes::{
    file_type_from_mode, Attributes, StatFs, VIRTUAL_BLOCK_SIZE, VIRTUAL_FILE_SIZE, VIRTUAL_MODE,
};
pub use dispatch::{DirEntry, OrthoFs};
pub use error::FsError;
pub use filename::{
    classify, is_dsf_filename, parse_dds_filename, parse_ter_filename, DdsFilename, ParseError,
    PathKind, TerrainFilename, ZOOM_MARKER,
};
pub use filesystem::OrthoFuse;
pub use handles::VIRTUAL_HANDLE;
pub use inode::{InodeTable, ROOT_INODE};
pub use mount::{mount, spawn, MountConfig, MountError, FS_NAME};
pub use path::BackingRoot;
