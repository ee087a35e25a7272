//! Settings structs for each configuration section.
//!
//! Each struct is one `[section]` of the INI file. Parsing lives in
//! [`super::parser`] and serialization in [`super::writer`].

use crate::cache::TileCacheConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathSettings,
    pub tiles: TileSettings,
    pub cache: CacheSettings,
    pub fuse: FuseSettings,
    pub logging: LoggingSettings,
}

/// `[paths]`
#[derive(Debug, Clone)]
pub struct PathSettings {
    /// Backing directory whose tree is exposed through the mount
    pub root: Option<PathBuf>,
    /// Where the filesystem is mounted
    pub mountpoint: Option<PathBuf>,
    /// Scratch directory handed to tile providers
    pub cache_dir: PathBuf,
}

/// `[tiles]`
#[derive(Debug, Clone, Default)]
pub struct TileSettings {
    /// Replaces the map type parsed from every texture name
    pub maptype_override: Option<String>,
}

/// `[cache]`
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Entry count below which nothing is evicted
    pub watermark: usize,
    /// Resident memory ceiling in bytes
    pub memory_limit: u64,
    /// Maximum entries evicted per pass
    pub evict_batch: usize,
    /// Seconds between reclamation cycles
    pub reclaim_interval: u64,
}

/// `[fuse]`
#[derive(Debug, Clone)]
pub struct FuseSettings {
    /// Worker threads for reads (0 = number of CPUs, 1 = inline)
    pub threads: usize,
    pub allow_other: bool,
    /// Owner reported for generated textures
    pub uid: u32,
    pub gid: u32,
}

/// `[logging]`
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub file: PathBuf,
    pub debug: bool,
}

impl ConfigFile {
    /// Tile cache configuration derived from `[paths]`, `[tiles]` and `[cache]`.
    pub fn tile_cache_config(&self) -> TileCacheConfig {
        TileCacheConfig {
            cache_dir: self.paths.cache_dir.clone(),
            maptype_override: self.tiles.maptype_override.clone(),
            watermark: self.cache.watermark,
            memory_limit: self.cache.memory_limit,
            evict_batch: self.cache.evict_batch,
            reclaim_interval: Duration::from_secs(self.cache.reclaim_interval),
        }
    }
}
