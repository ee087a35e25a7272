//! In-memory tile cache.
//!
//! [`TileCache`] maps a tile identity to a shared [`TileEntry`] wrapping the
//! tile's content provider. Entries are created on first open, shared by
//! every concurrent opener, and reclaimed by [`CacheReclaimer`] once nobody
//! holds them and the process is over its memory ceiling.
//!
//! ```
//! use ortholayer::cache::{TileCache, TileCacheConfig, TileKey};
//! use ortholayer::log::NoOpLogger;
//! use ortholayer::provider::PlaceholderTileFactory;
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let cache = TileCache::new(
//!     Arc::new(PlaceholderTileFactory::new()),
//!     TileCacheConfig { cache_dir: dir.path().to_path_buf(), ..Default::default() },
//!     Arc::new(NoOpLogger),
//! );
//!
//! let key = TileKey::new(24832, 12416, "BI", 16);
//! cache.acquire(&key).unwrap();
//! let header = cache.lease(&key).unwrap().read(0, 4).unwrap();
//! assert_eq!(header, b"DDS ");
//! cache.release(&key);
//! ```

mod entry;
mod memory;
mod reclaim;
mod stats;
mod tiles;
mod types;

pub use entry::TileEntry;
pub use memory::{FixedMemory, MemoryProbe, ProcessMemory};
pub use reclaim::CacheReclaimer;
pub use stats::CacheStats;
pub use tiles::{ReclaimReport, TileCache, TileLease};
pub use types::{CacheError, TileCacheConfig, TileKey};
