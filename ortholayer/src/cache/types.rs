//! Core types for the tile cache.

use crate::fuse::DdsFilename;
use crate::provider::ProviderError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Cache key uniquely identifying a generated tile.
///
/// All four fields are kept separately, so a map type containing `_` can
/// never alias another tile the way a concatenated string key could.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub row: u32,
    pub col: u32,
    /// Imagery source tag (after any configured override)
    pub map_type: String,
    pub zoom: u8,
}

impl TileKey {
    pub fn new(row: u32, col: u32, map_type: impl Into<String>, zoom: u8) -> Self {
        Self {
            row,
            col,
            map_type: map_type.into(),
            zoom,
        }
    }

    /// Replace the map type, keeping the coordinates.
    pub fn with_map_type(mut self, map_type: impl Into<String>) -> Self {
        self.map_type = map_type.into();
        self
    }
}

impl From<&DdsFilename> for TileKey {
    fn from(name: &DdsFilename) -> Self {
        Self::new(name.row, name.col, name.map_type.clone(), name.zoom)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}{}",
            self.row, self.col, self.map_type, self.zoom
        )
    }
}

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The content provider could not be constructed for this tile
    #[error("Tile {key} unavailable: {source}")]
    TileUnavailable {
        key: TileKey,
        #[source]
        source: ProviderError,
    },

    /// A read against an existing tile failed
    #[error("Read of tile {key} failed: {source}")]
    ReadFailed {
        key: TileKey,
        #[source]
        source: ProviderError,
    },

    /// The tile was evicted or cleared while the caller still held it
    #[error("Tile {0} was closed")]
    Closed(TileKey),
}

/// Tile cache configuration.
#[derive(Debug, Clone)]
pub struct TileCacheConfig {
    /// Directory handed to the content provider for its own scratch files
    pub cache_dir: std::path::PathBuf,
    /// Replaces every parsed map type when set
    pub maptype_override: Option<String>,
    /// Minimum entry count before eviction is considered (default: 90)
    pub watermark: usize,
    /// Resident memory ceiling in bytes (default: 2 GiB)
    pub memory_limit: u64,
    /// Maximum entries removed per eviction pass (default: 20)
    pub evict_batch: usize,
    /// Interval between reclamation cycles (default: 15s)
    pub reclaim_interval: Duration,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::path::PathBuf::from(".cache"),
            maptype_override: None,
            watermark: 90,
            memory_limit: 2 * 1024 * 1024 * 1024,
            evict_batch: 20,
            reclaim_interval: Duration::from_secs(15),
        }
    }
}
