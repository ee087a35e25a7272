//! Default values for every configuration setting.

use super::file::config_directory;
use super::settings::*;

pub const DEFAULT_WATERMARK: usize = 90;
pub const DEFAULT_MEMORY_LIMIT: u64 = 2 * 1024 * 1024 * 1024;
pub const DEFAULT_EVICT_BATCH: usize = 20;
pub const DEFAULT_RECLAIM_INTERVAL_SECS: u64 = 15;
/// 0 selects the number of CPUs
pub const DEFAULT_FUSE_THREADS: usize = 0;

/// Number of available CPU cores.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for ConfigFile {
    fn default() -> Self {
        let dir = config_directory();
        Self {
            paths: PathSettings {
                root: None,
                mountpoint: None,
                cache_dir: dir.join("cache"),
            },
            tiles: TileSettings::default(),
            cache: CacheSettings {
                watermark: DEFAULT_WATERMARK,
                memory_limit: DEFAULT_MEMORY_LIMIT,
                evict_batch: DEFAULT_EVICT_BATCH,
                reclaim_interval: DEFAULT_RECLAIM_INTERVAL_SECS,
            },
            fuse: FuseSettings {
                threads: DEFAULT_FUSE_THREADS,
                allow_other: true,
                uid: 0,
                gid: 0,
            },
            logging: LoggingSettings {
                file: dir.join("ortholayer.log"),
                debug: false,
            },
        }
    }
}
