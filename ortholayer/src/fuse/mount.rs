//! Mounting an [`OrthoFuse`] filesystem.

use crate::fuse::filesystem::OrthoFuse;
use fuser::{BackgroundSession, MountOption};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name shown in the mount table.
pub const FS_NAME: &str = "ortholayer";

#[derive(Debug, Error)]
pub enum MountError {
    #[error("Failed to create mountpoint {}: {source}", path.display())]
    CreateMountpoint { path: PathBuf, source: io::Error },

    #[error("Mountpoint is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to start FUSE workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("FUSE mount failed: {0}")]
    Io(#[from] io::Error),
}

/// Kernel-side mount settings.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Let other users (the simulator may run as one) see the mount
    pub allow_other: bool,
    /// Unmount when the process exits, even abnormally. Only honored
    /// together with `allow_other`.
    pub auto_unmount: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            allow_other: true,
            auto_unmount: true,
        }
    }
}

impl MountConfig {
    pub fn options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(FS_NAME.to_string()),
            MountOption::DefaultPermissions,
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
            if self.auto_unmount {
                options.push(MountOption::AutoUnmount);
            }
        }
        options
    }
}

/// Create the mountpoint if it is missing and check it is a directory.
fn prepare_mountpoint(mountpoint: &Path) -> Result<(), MountError> {
    if !mountpoint.exists() {
        fs::create_dir_all(mountpoint).map_err(|source| MountError::CreateMountpoint {
            path: mountpoint.to_path_buf(),
            source,
        })?;
    }
    if !mountpoint.is_dir() {
        return Err(MountError::NotADirectory(mountpoint.to_path_buf()));
    }
    Ok(())
}

/// Mount and serve on the calling thread until unmounted.
pub fn mount(fs: OrthoFuse, mountpoint: &Path, config: &MountConfig) -> Result<(), MountError> {
    prepare_mountpoint(mountpoint)?;
    fuser::mount2(fs, mountpoint, &config.options())?;
    Ok(())
}

/// Mount and serve on a background thread.
///
/// The filesystem is unmounted when the returned session is dropped.
pub fn spawn(
    fs: OrthoFuse,
    mountpoint: &Path,
    config: &MountConfig,
) -> Result<BackgroundSession, MountError> {
    prepare_mountpoint(mountpoint)?;
    Ok(fuser::spawn_mount2(fs, mountpoint, &config.options())?)
}
