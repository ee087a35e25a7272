//! Concurrency tests for the tile cache.
//!
//! These verify:
//! - Concurrent first requests for one tile build it exactly once
//! - Reference counts balance under concurrent open/release
//! - Hits and misses are counted once per construction or idle reuse
//! - Reclamation never evicts open or in-flight tiles
//! - The background reclaimer evicts under memory pressure and stops promptly

mod common;

use common::PatternFactory;
use ortholayer::cache::{
    CacheReclaimer, FixedMemory, MemoryProbe, TileCache, TileCacheConfig, TileKey,
};
use ortholayer::log::NoOpLogger;
use ortholayer::provider::TileProviderFactory;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn cache_with(factory: Arc<PatternFactory>, config: TileCacheConfig) -> (TempDir, Arc<TileCache>) {
    let dir = TempDir::new().unwrap();
    let cache = TileCache::new(
        factory as Arc<dyn TileProviderFactory>,
        TileCacheConfig {
            cache_dir: dir.path().to_path_buf(),
            ..config
        },
        Arc::new(NoOpLogger),
    );
    (dir, Arc::new(cache))
}

/// Reclaims as soon as anything is cached.
fn eager_config(evict_batch: usize) -> TileCacheConfig {
    TileCacheConfig {
        watermark: 1,
        memory_limit: 0,
        evict_batch,
        reclaim_interval: Duration::from_millis(20),
        ..TileCacheConfig::default()
    }
}

fn key(row: u32) -> TileKey {
    TileKey::new(row, 100, "BI", 16)
}

/// (misses, hits)
fn counts(cache: &TileCache) -> (u64, u64) {
    let stats = cache.stats();
    (stats.misses, stats.hits)
}

// =============================================================================
// Creation
// =============================================================================

#[test]
fn test_concurrent_first_open_builds_once() {
    let factory = Arc::new(PatternFactory::slow(Duration::from_millis(50)));
    let (_dir, cache) = cache_with(Arc::clone(&factory), TileCacheConfig::default());
    let barrier = Arc::new(Barrier::new(16));

    let workers: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.acquire(&key(1)).unwrap()
            })
        })
        .collect();
    let entries: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(factory.created(), 1);
    assert!(entries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(cache.ref_count(&key(1)), Some(16));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_distinct_tiles_build_in_parallel() {
    let factory = Arc::new(PatternFactory::slow(Duration::from_millis(200)));
    let (_dir, cache) = cache_with(Arc::clone(&factory), TileCacheConfig::default());

    let start = Instant::now();
    let workers: Vec<_> = (0..4)
        .map(|row| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_create(&key(row)).map(|_| ()))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap().unwrap();
    }

    // Construction happens outside the cache lock
    assert!(start.elapsed() < Duration::from_millis(700));
    assert_eq!(factory.created(), 4);
}

#[test]
fn test_hit_miss_accounting() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), TileCacheConfig::default());
    cache.get_or_create(&key(1)).unwrap();
    assert_eq!(counts(&cache), (1, 0));

    // Idle reuse
    cache.acquire(&key(1)).unwrap();
    assert_eq!(counts(&cache), (1, 1));

    // Reuse while open counts as neither
    cache.acquire(&key(1)).unwrap();
    cache.lease(&key(1)).unwrap().read(0, 4).unwrap();
    assert_eq!(counts(&cache), (1, 1));

    cache.release(&key(1));
    cache.release(&key(1));
    cache.get_or_create(&key(1)).unwrap();
    assert_eq!(counts(&cache), (1, 2));

    cache.acquire(&key(2)).unwrap();
    assert_eq!(counts(&cache), (2, 2));
    assert_eq!(factory.created(), 2);
}

#[test]
fn test_joining_construction_counts_as_hit() {
    let factory = Arc::new(PatternFactory::slow(Duration::from_millis(200)));
    let (_dir, cache) = cache_with(Arc::clone(&factory), TileCacheConfig::default());

    let builder = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.get_or_create(&key(1)).map(|_| ()))
    };
    thread::sleep(Duration::from_millis(50));
    cache.acquire(&key(1)).unwrap();
    builder.join().unwrap().unwrap();

    // One caller built the tile, the other waited on it
    let stats = cache.stats();
    assert_eq!(factory.created(), 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(cache.ref_count(&key(1)), Some(1));
}

// =============================================================================
// Reference counting
// =============================================================================

#[test]
fn test_refcounts_balance_under_contention() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), TileCacheConfig::default());

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for round in 0..200u32 {
                    let k = key((i + round) % 4);
                    cache.acquire(&k).unwrap();
                    let lease = cache.lease(&k).unwrap();
                    assert_eq!(lease.read(0, 4).unwrap().len(), 4);
                    drop(lease);
                    cache.release(&k);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for row in 0..4 {
        assert_eq!(cache.ref_count(&key(row)), Some(0));
    }
    assert_eq!(cache.stats().open_refs, 0);
    assert_eq!(factory.created(), 4);
}

// =============================================================================
// Reclamation
// =============================================================================

#[test]
fn test_reclaim_skips_open_tiles() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), eager_config(100));

    cache.acquire(&key(1)).unwrap();
    cache.get_or_create(&key(2)).unwrap();
    cache.acquire(&key(3)).unwrap();

    let report = cache.reclaim(|| Some(u64::MAX));

    assert_eq!(report.evicted, 1);
    assert!(!cache.contains(&key(2)));
    assert!(cache.contains(&key(1)));
    assert!(cache.contains(&key(3)));
    assert_eq!(factory.closed(), 1);
}

#[test]
fn test_reclaim_skips_leased_tiles() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), eager_config(100));

    let lease = cache.lease(&key(1)).unwrap();
    cache.reclaim(|| Some(u64::MAX));

    // The read in progress still completes
    assert!(cache.contains(&key(1)));
    assert_eq!(lease.read(1000, 8).unwrap().len(), 8);
    drop(lease);

    cache.reclaim(|| Some(u64::MAX));
    assert!(!cache.contains(&key(1)));
}

#[test]
fn test_reclaim_oldest_first_in_batches() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), eager_config(2));
    for row in 0..5 {
        cache.get_or_create(&key(row)).unwrap();
    }

    // Pressure lifts after the first batch
    let mut calls = 0;
    let report = cache.reclaim(|| {
        calls += 1;
        Some(if calls == 1 { u64::MAX } else { 0 })
    });

    assert_eq!(report.evicted, 2);
    assert_eq!(report.passes, 1);
    assert!(!cache.contains(&key(0)));
    assert!(!cache.contains(&key(1)));
    assert!(cache.contains(&key(2)));
}

#[test]
fn test_reclaim_needs_both_watermark_and_pressure() {
    let factory = Arc::new(PatternFactory::default());
    let config = TileCacheConfig {
        watermark: 10,
        memory_limit: 0,
        ..TileCacheConfig::default()
    };
    let (_dir, cache) = cache_with(Arc::clone(&factory), config);
    for row in 0..5 {
        cache.get_or_create(&key(row)).unwrap();
    }

    assert_eq!(cache.reclaim(|| Some(u64::MAX)).evicted, 0);
    assert_eq!(cache.len(), 5);
}

#[test]
fn test_reclaim_concurrent_with_readers() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), eager_config(4));

    let readers: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for round in 0..100u32 {
                    let k = key(i * 10 + round % 5);
                    cache.acquire(&k).unwrap();
                    let lease = cache.lease(&k).unwrap();
                    // An entry is never closed under an open reference
                    assert_eq!(lease.read(0, 16).unwrap().len(), 16);
                    drop(lease);
                    cache.release(&k);
                }
            })
        })
        .collect();

    let reclaimer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..50 {
                cache.reclaim(|| Some(u64::MAX));
                thread::yield_now();
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    reclaimer.join().unwrap();
    assert_eq!(cache.stats().open_refs, 0);
}

#[test]
fn test_background_reclaimer_evicts_under_pressure() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), eager_config(20));
    for row in 0..3 {
        cache.get_or_create(&key(row)).unwrap();
    }
    cache.acquire(&key(9)).unwrap();

    let probe = Arc::new(FixedMemory::new(u64::MAX));
    let reclaimer = CacheReclaimer::start(
        Arc::clone(&cache),
        Arc::clone(&probe) as Arc<dyn MemoryProbe>,
        Duration::from_millis(20),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while cache.len() > 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&key(9)));

    let stopping = Instant::now();
    drop(reclaimer);
    assert!(stopping.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_unknown_memory_never_reclaims() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), eager_config(20));
    cache.get_or_create(&key(1)).unwrap();

    let probe = FixedMemory::unknown();
    assert_eq!(cache.reclaim(|| probe.resident_bytes()).evicted, 0);
    assert!(cache.contains(&key(1)));
}

#[test]
fn test_clear_closes_everything() {
    let factory = Arc::new(PatternFactory::default());
    let (_dir, cache) = cache_with(Arc::clone(&factory), TileCacheConfig::default());
    cache.acquire(&key(1)).unwrap();
    cache.get_or_create(&key(2)).unwrap();

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(factory.closed(), 2);
}
