//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use ortholayer::cache::{TileCache, TileCacheConfig, TileKey};
use ortholayer::fuse::{OrthoFs, VIRTUAL_FILE_SIZE};
use ortholayer::log::NoOpLogger;
use ortholayer::provider::{clamp_range, ProviderError, TileProvider, TileProviderFactory};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Byte at `offset` of the tile with `seed`.
pub fn pattern_byte(seed: u32, offset: u64) -> u8 {
    ((offset.wrapping_mul(31) + u64::from(seed)) % 251) as u8
}

/// Serves a byte pattern derived from the tile row.
pub struct PatternTile {
    seed: u32,
    broken: bool,
    closed: AtomicBool,
    closes: Arc<AtomicUsize>,
}

impl TileProvider for PatternTile {
    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }
        if self.broken {
            return Err(ProviderError::Unavailable(format!("row {} corrupt", self.seed)));
        }
        let Some(end) = clamp_range(offset, len, VIRTUAL_FILE_SIZE) else {
            return Ok(Vec::new());
        };
        Ok((offset..end).map(|i| pattern_byte(self.seed, i)).collect())
    }

    fn size(&self) -> u64 {
        VIRTUAL_FILE_SIZE
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Factory that counts constructions and closes.
#[derive(Default)]
pub struct PatternFactory {
    pub created: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    /// Simulated generation time
    pub delay: Duration,
    /// Rows whose construction fails
    pub failing_row: Option<u32>,
    /// Rows that construct but fail every read
    pub broken_row: Option<u32>,
}

impl PatternFactory {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl TileProviderFactory for PatternFactory {
    fn create(
        &self,
        key: &TileKey,
        _cache_dir: &Path,
    ) -> Result<Arc<dyn TileProvider>, ProviderError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.failing_row == Some(key.row) {
            return Err(ProviderError::Unavailable(format!("row {} offline", key.row)));
        }
        Ok(Arc::new(PatternTile {
            seed: key.row,
            broken: self.broken_row == Some(key.row),
            closed: AtomicBool::new(false),
            closes: Arc::clone(&self.closes),
        }))
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

/// A dispatch layer over a temporary backing directory.
pub struct Harness {
    pub backing: TempDir,
    pub cache_dir: TempDir,
    pub factory: Arc<PatternFactory>,
    pub fs: OrthoFs,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_factory(PatternFactory::default(), TileCacheConfig::default())
    }

    pub fn with_factory(factory: PatternFactory, config: TileCacheConfig) -> Self {
        let backing = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let factory = Arc::new(factory);
        let cache = Arc::new(TileCache::new(
            Arc::clone(&factory) as Arc<dyn TileProviderFactory>,
            TileCacheConfig {
                cache_dir: cache_dir.path().to_path_buf(),
                ..config
            },
            Arc::new(NoOpLogger),
        ));
        let fs = OrthoFs::new(backing.path(), cache);
        Self {
            backing,
            cache_dir,
            factory,
            fs,
        }
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        self.fs.cache()
    }
}
