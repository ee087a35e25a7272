//! Background reclamation of idle tiles.
//!
//! The reclaimer runs on its own thread and periodically asks the cache to
//! evict idle entries while the process is over its memory ceiling. Each
//! cycle also logs occupancy, memory use and hit/miss counts.

use crate::cache::memory::MemoryProbe;
use crate::cache::tiles::TileCache;
use crate::config::format_size;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest sleep between shutdown checks.
const SHUTDOWN_TICK: Duration = Duration::from_millis(250);

/// Handle to the reclamation thread.
///
/// Dropping the handle stops the thread and waits for it.
pub struct CacheReclaimer {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl CacheReclaimer {
    /// Start reclaiming `cache` every `interval`.
    pub fn start(
        cache: Arc<TileCache>,
        probe: Arc<dyn MemoryProbe>,
        interval: Duration,
    ) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let thread_handle = thread::Builder::new()
            .name("tile-reclaim".to_string())
            .spawn(move || Self::run_loop(cache, probe, interval, shutdown_clone))?;

        info!("Tile reclaimer started (interval: {:?})", interval);

        Ok(Self {
            thread_handle: Some(thread_handle),
            shutdown,
        })
    }

    fn run_loop(
        cache: Arc<TileCache>,
        probe: Arc<dyn MemoryProbe>,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) {
        let tick = interval.min(SHUTDOWN_TICK);
        let mut elapsed = Duration::ZERO;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                debug!("Tile reclaimer received shutdown signal");
                break;
            }

            thread::sleep(tick);
            elapsed += tick;
            if elapsed < interval {
                continue;
            }
            elapsed = Duration::ZERO;

            let report = cache.reclaim(|| probe.resident_bytes());
            let stats = cache.stats();
            let memory = report
                .resident_bytes
                .map(format_size)
                .unwrap_or_else(|| "unknown".to_string());
            info!(
                "Tiles cached: {}, open: {}, resident memory: {}, hits: {}, misses: {}",
                stats.entries, stats.open_refs, memory, stats.hits, stats.misses
            );
            if report.evicted > 0 {
                debug!(
                    "Evicted {} tiles in {} passes",
                    report.evicted, report.passes
                );
            }
        }

        debug!("Tile reclaimer stopped");
    }

    /// Ask the thread to stop. Returns immediately.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Tile reclaimer thread panicked: {:?}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for CacheReclaimer {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
