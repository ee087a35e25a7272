//! OrthoLayer - on-demand ortho textures for X-Plane
//!
//! Mounts a directory of scenery through FUSE. Texture files named like
//! `24832_12416_BI16.dds` do not have to exist on disk: they are produced
//! by a [`provider::TileProvider`] when first opened, held in a
//! reference-counted [`cache::TileCache`], and reclaimed under memory
//! pressure once no reader holds them. Everything else passes through to
//! the backing directory.
//!
//! ```no_run
//! use ortholayer::cache::{TileCache, TileCacheConfig};
//! use ortholayer::fuse::{MountConfig, OrthoFs, OrthoFuse};
//! use ortholayer::log::TracingLogger;
//! use ortholayer::provider::PlaceholderTileFactory;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(TileCache::new(
//!     Arc::new(PlaceholderTileFactory::new()),
//!     TileCacheConfig::default(),
//!     Arc::new(TracingLogger),
//! ));
//! let fs = Arc::new(OrthoFs::new("/data/ortho", cache));
//! let fuse = OrthoFuse::new(fs, 0)?;
//! ortholayer::fuse::mount(fuse, Path::new("/mnt/ortho"), &MountConfig::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod dds;
pub mod fuse;
pub mod log;
pub mod logging;
pub mod provider;

/// Version of the OrthoLayer library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
