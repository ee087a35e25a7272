//! Tile cache statistics.

use std::time::{Duration, Instant};

/// Point-in-time view of the tile cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Entries currently held
    pub entries: usize,
    /// Sum of open references across all entries
    pub open_refs: usize,
    /// Reuses of an entry nobody had open
    pub hits: u64,
    /// Fresh insertions
    pub misses: u64,
    /// Entries removed by reclamation
    pub evictions: u64,
    pub created_at: Instant,
}

impl CacheStats {
    /// Hit rate over all counted lookups (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Counters updated under the cache lock.
#[derive(Debug)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub created_at: Instant,
}

impl Counters {
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            created_at: Instant::now(),
        }
    }
}
