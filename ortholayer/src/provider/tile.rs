//! Tile content provider traits.
//!
//! The cache only knows that a tile can be opened, read by byte range and
//! closed. How the bytes are produced (downloading imagery, compositing,
//! compressing) is up to the provider.

use crate::cache::TileKey;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by tile content providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Local I/O failed (cache directory, scratch files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The provider cannot produce this tile
    #[error("Tile not available: {0}")]
    Unavailable(String),

    /// The provider was closed before the read
    #[error("Provider closed")]
    Closed,
}

/// Byte-addressable content of one generated tile.
///
/// Implementations must tolerate concurrent reads from many threads and a
/// `close` that races with nothing: the cache only closes a provider once
/// no reader holds it.
pub trait TileProvider: Send + Sync {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only when the range runs past the end of the
    /// tile, and an empty buffer when `offset` is at or past the end.
    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, ProviderError>;

    /// Total size of the tile in bytes.
    fn size(&self) -> u64;

    /// Release any resources held by the provider.
    fn close(&self);
}

/// Constructs a provider for a tile identity.
pub trait TileProviderFactory: Send + Sync {
    /// Open the tile identified by `key`, using `cache_dir` for any
    /// on-disk scratch state.
    fn create(
        &self,
        key: &TileKey,
        cache_dir: &Path,
    ) -> Result<Arc<dyn TileProvider>, ProviderError>;

    /// Name used in log messages.
    fn name(&self) -> &str;
}

/// Clamp a `(offset, len)` request to a tile of `size` bytes.
///
/// Returns the absolute end offset of the readable range, or `None` when
/// nothing can be read.
pub fn clamp_range(offset: u64, len: usize, size: u64) -> Option<u64> {
    if offset >= size || len == 0 {
        return None;
    }
    Some(offset.saturating_add(len as u64).min(size))
}
