//! Reference-counted tile cache.
//!
//! One mutex guards the identity map, per-entry counts and statistics. It
//! is held only long enough to look up, insert, remove or adjust counts;
//! provider construction, reads and close always happen outside it.
//!
//! Each slot carries two counts:
//! - `refs`: open file handles (virtual `open` increments, `release`
//!   decrements)
//! - `inflight`: callers currently constructing or reading through the
//!   entry
//!
//! Reclamation only removes slots where both are zero, so an entry can
//! never be closed underneath a reader.
//!
//! A provider whose read fails is discarded at once. References still held
//! on it move to a per-key retired count, so the matching releases drain
//! that count instead of the replacement entry's.

use crate::cache::entry::TileEntry;
use crate::cache::stats::{CacheStats, Counters};
use crate::cache::types::{CacheError, TileCacheConfig, TileKey};
use crate::fuse::DdsFilename;
use crate::log::Logger;
use crate::provider::{TileProvider, TileProviderFactory};
use crate::{log_debug, log_info, log_warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Slot {
    entry: Arc<TileEntry>,
    refs: usize,
    inflight: usize,
    seq: u64,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.refs == 0 && self.inflight == 0
    }
}

struct Slots {
    map: HashMap<TileKey, Slot>,
    /// Insertion order, oldest first
    order: BTreeMap<u64, TileKey>,
    next_seq: u64,
    /// Open references on discarded entries, by key
    retired: HashMap<TileKey, usize>,
    counters: Counters,
}

impl Slots {
    fn remove(&mut self, key: &TileKey) -> Option<Slot> {
        let slot = self.map.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot)
    }

    /// Slot for `key` only if it still holds `entry`.
    fn slot_for(&mut self, key: &TileKey, entry: &Arc<TileEntry>) -> Option<&mut Slot> {
        self.map
            .get_mut(key)
            .filter(|slot| Arc::ptr_eq(&slot.entry, entry))
    }
}

/// What a caller keeps on the entry once it is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    Nothing,
    Reference,
    Pin,
}

/// Outcome of one reclamation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Entries before the cycle
    pub entries_before: usize,
    /// Entries after the cycle
    pub entries_after: usize,
    /// Entries removed and closed
    pub evicted: usize,
    /// Eviction passes that removed at least one entry
    pub passes: usize,
    /// Last resident memory sample
    pub resident_bytes: Option<u64>,
}

/// Bounded, reference-counted cache of tile providers.
pub struct TileCache {
    slots: Mutex<Slots>,
    factory: Arc<dyn TileProviderFactory>,
    config: TileCacheConfig,
    logger: Arc<dyn Logger>,
}

impl TileCache {
    pub fn new(
        factory: Arc<dyn TileProviderFactory>,
        config: TileCacheConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
                retired: HashMap::new(),
                counters: Counters::new(),
            }),
            factory,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &TileCacheConfig {
        &self.config
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache key for a parsed filename, with the map-type override applied.
    pub fn key_for(&self, name: &DdsFilename) -> TileKey {
        self.normalize(&TileKey::from(name))
    }

    fn normalize(&self, key: &TileKey) -> TileKey {
        match &self.config.maptype_override {
            Some(map_type) => key.clone().with_map_type(map_type.as_str()),
            None => key.clone(),
        }
    }

    /// Fetch the entry for `key`, creating and initializing it if needed.
    ///
    /// Concurrent callers for the same key share one entry and one provider
    /// construction. If construction fails the entry is removed and every
    /// waiting caller gets [`CacheError::TileUnavailable`].
    pub fn get_or_create(&self, key: &TileKey) -> Result<Arc<TileEntry>, CacheError> {
        self.obtain(key, Hold::Nothing).map(|(entry, _)| entry)
    }

    /// Open a reference on `key` (virtual file open).
    pub fn acquire(&self, key: &TileKey) -> Result<Arc<TileEntry>, CacheError> {
        self.obtain(key, Hold::Reference).map(|(entry, _)| entry)
    }

    /// Drop a reference on `key` (virtual file release).
    ///
    /// Never fails: releasing an unknown key or one with no open references
    /// is logged and otherwise ignored.
    pub fn release(&self, key: &TileKey) {
        let key = self.normalize(key);
        let mut slots = self.slots();
        if let Some(outstanding) = slots.retired.get_mut(&key) {
            *outstanding -= 1;
            if *outstanding == 0 {
                slots.retired.remove(&key);
            }
            return;
        }
        match slots.map.get_mut(&key) {
            Some(slot) if slot.refs > 0 => slot.refs -= 1,
            Some(_) => log_warn!(self.logger, "Release of {} with no open references", key),
            None => log_warn!(self.logger, "Release of unknown tile {}", key),
        }
    }

    /// Pin `key` for the duration of a read.
    ///
    /// Reclamation skips the entry until the lease is dropped.
    pub fn lease(&self, key: &TileKey) -> Result<TileLease<'_>, CacheError> {
        let (entry, provider) = self.obtain(key, Hold::Pin)?;
        Ok(TileLease {
            cache: self,
            entry,
            provider,
        })
    }

    fn obtain(
        &self,
        key: &TileKey,
        hold: Hold,
    ) -> Result<(Arc<TileEntry>, Arc<dyn TileProvider>), CacheError> {
        let key = self.normalize(key);

        let entry = {
            let mut guard = self.slots();
            let slots = &mut *guard;
            // Joining an entry still under construction counts as a hit:
            // only the inserting caller pays for the build.
            if let Some(slot) = slots.map.get_mut(&key) {
                slot.inflight += 1;
                if slot.refs == 0 {
                    slots.counters.hits += 1;
                }
                Arc::clone(&slot.entry)
            } else {
                let entry = Arc::new(TileEntry::new(key.clone()));
                let seq = slots.next_seq;
                slots.next_seq += 1;
                slots.map.insert(
                    key.clone(),
                    Slot {
                        entry: Arc::clone(&entry),
                        refs: 0,
                        inflight: 1,
                        seq,
                    },
                );
                slots.order.insert(seq, key.clone());
                slots.counters.misses += 1;
                log_debug!(self.logger, "Created tile entry {}", key);
                entry
            }
        };

        let result = entry.initialize(self.factory.as_ref(), &self.config.cache_dir);

        let mut slots = self.slots();
        match result {
            Ok(provider) => {
                let Some(slot) = slots.slot_for(&key, &entry) else {
                    // Cleared while we were constructing
                    return Err(CacheError::Closed(key));
                };
                match hold {
                    Hold::Nothing => slot.inflight -= 1,
                    Hold::Reference => {
                        slot.inflight -= 1;
                        slot.refs += 1;
                    }
                    Hold::Pin => {}
                }
                Ok((entry, provider))
            }
            Err(err) => {
                if slots.slot_for(&key, &entry).is_some() {
                    slots.remove(&key);
                }
                drop(slots);
                log_warn!(self.logger, "{}", err);
                Err(err)
            }
        }
    }

    /// Drop `entry` after its provider failed, so the next caller builds a
    /// fresh one.
    fn discard(&self, entry: &Arc<TileEntry>) {
        {
            let mut guard = self.slots();
            let slots = &mut *guard;
            if slots.slot_for(entry.key(), entry).is_none() {
                return;
            }
            let Some(slot) = slots.remove(entry.key()) else {
                return;
            };
            if slot.refs > 0 {
                *slots.retired.entry(entry.key().clone()).or_insert(0) += slot.refs;
            }
        }
        log_warn!(self.logger, "Discarding tile {} after a failed read", entry.key());
        entry.close();
    }

    fn unpin(&self, entry: &Arc<TileEntry>) {
        let mut slots = self.slots();
        if let Some(slot) = slots.slot_for(entry.key(), entry) {
            slot.inflight = slot.inflight.saturating_sub(1);
        }
    }

    /// Run one reclamation cycle.
    ///
    /// While the cache holds at least `watermark` entries and `resident`
    /// reports more than `memory_limit` bytes, removes up to `evict_batch`
    /// of the oldest idle entries per pass. Stops as soon as a pass finds
    /// nothing to remove. Evicted providers are closed after the lock is
    /// released.
    pub fn reclaim<F>(&self, mut resident: F) -> ReclaimReport
    where
        F: FnMut() -> Option<u64>,
    {
        let mut report = ReclaimReport {
            entries_before: self.len(),
            ..ReclaimReport::default()
        };

        loop {
            let memory = resident();
            report.resident_bytes = memory;

            let victims: Vec<Arc<TileEntry>> = {
                let mut guard = self.slots();
                let slots = &mut *guard;
                let over_memory = memory.is_some_and(|bytes| bytes > self.config.memory_limit);
                if slots.map.len() < self.config.watermark || !over_memory {
                    break;
                }

                let keys: Vec<TileKey> = slots
                    .order
                    .values()
                    .filter(|key| slots.map.get(*key).is_some_and(Slot::is_idle))
                    .take(self.config.evict_batch)
                    .cloned()
                    .collect();

                let victims: Vec<_> = keys
                    .iter()
                    .filter_map(|key| slots.remove(key))
                    .map(|slot| slot.entry)
                    .collect();
                slots.counters.evictions += victims.len() as u64;
                victims
            };

            if victims.is_empty() {
                break;
            }

            for entry in &victims {
                log_debug!(self.logger, "Evicting tile {}", entry.key());
                entry.close();
            }
            report.evicted += victims.len();
            report.passes += 1;
        }

        report.entries_after = self.len();
        if report.evicted > 0 {
            log_info!(
                self.logger,
                "Reclaimed {} tiles ({} -> {} cached)",
                report.evicted,
                report.entries_before,
                report.entries_after
            );
        }
        report
    }

    /// Remove and close every entry, regardless of open references.
    pub fn clear(&self) {
        let entries: Vec<Arc<TileEntry>> = {
            let mut slots = self.slots();
            slots.order.clear();
            slots.retired.clear();
            slots.map.drain().map(|(_, slot)| slot.entry).collect()
        };
        for entry in &entries {
            entry.close();
        }
        if !entries.is_empty() {
            log_info!(self.logger, "Closed {} cached tiles", entries.len());
        }
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.slots();
        CacheStats {
            entries: slots.map.len(),
            open_refs: slots.map.values().map(|slot| slot.refs).sum(),
            hits: slots.counters.hits,
            misses: slots.counters.misses,
            evictions: slots.counters.evictions,
            created_at: slots.counters.created_at,
        }
    }

    pub fn len(&self) -> usize {
        self.slots().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open references on `key`, or `None` if it is not cached.
    pub fn ref_count(&self, key: &TileKey) -> Option<usize> {
        let key = self.normalize(key);
        self.slots().map.get(&key).map(|slot| slot.refs)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        let key = self.normalize(key);
        self.slots().map.contains_key(&key)
    }
}

impl Drop for TileCache {
    fn drop(&mut self) {
        self.clear();
    }
}

/// A pinned entry for one read.
///
/// Dropping the lease unpins the entry.
pub struct TileLease<'a> {
    cache: &'a TileCache,
    entry: Arc<TileEntry>,
    provider: Arc<dyn TileProvider>,
}

impl TileLease<'_> {
    pub fn key(&self) -> &TileKey {
        self.entry.key()
    }

    pub fn size(&self) -> u64 {
        self.provider.size()
    }

    /// Read `len` bytes at `offset` from the pinned provider.
    ///
    /// A failed read removes the entry from the cache; open references
    /// keep their handle but later opens build a new provider.
    pub fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>, CacheError> {
        self.provider.read_range(offset, len).map_err(|source| {
            self.cache.discard(&self.entry);
            CacheError::ReadFailed {
                key: self.entry.key().clone(),
                source,
            }
        })
    }
}

impl Drop for TileLease<'_> {
    fn drop(&mut self) {
        self.cache.unpin(&self.entry);
    }
}
