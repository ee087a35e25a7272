//! Mapping mount-relative paths onto the backing directory.

use crate::fuse::error::FsError;
use std::path::{Component, Path, PathBuf};

/// The directory whose tree the mount exposes.
#[derive(Debug, Clone)]
pub struct BackingRoot {
    root: PathBuf,
}

impl BackingRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Host path for a mount-relative `path`.
    ///
    /// The join is lexical: `.` is dropped and `..` pops a component, but
    /// never above the root.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, FsError> {
        if path.as_os_str().is_empty() {
            return Err(FsError::InvalidArgument("empty path".to_string()));
        }

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(name) => {
                    resolved.push(name);
                    depth += 1;
                }
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(FsError::InvalidArgument(format!(
                            "{} escapes the mount root",
                            path.display()
                        )));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::Prefix(_) => {
                    return Err(FsError::InvalidArgument(format!(
                        "unsupported path prefix in {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(resolved)
    }

    /// Rewrite an absolute link target relative to the root.
    ///
    /// Relative targets are returned unchanged.
    pub fn relativize(&self, target: &Path) -> PathBuf {
        if !target.is_absolute() {
            return target.to_path_buf();
        }

        let root: Vec<Component<'_>> = self.root.components().collect();
        let target: Vec<Component<'_>> = target.components().collect();
        let common = root
            .iter()
            .zip(&target)
            .take_while(|(a, b)| a == b)
            .count();

        let mut relative = PathBuf::new();
        for _ in common..root.len() {
            relative.push("..");
        }
        for component in &target[common..] {
            relative.push(component.as_os_str());
        }
        if relative.as_os_str().is_empty() {
            relative.push(".");
        }
        relative
    }
}
