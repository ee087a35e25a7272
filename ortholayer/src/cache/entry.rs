//! A single cached tile.

use crate::cache::types::{CacheError, TileKey};
use crate::provider::{ProviderError, TileProvider, TileProviderFactory};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum EntryState {
    /// Inserted, provider not yet constructed
    Pending,
    Ready(Arc<dyn TileProvider>),
    /// Construction failed; the slot is being removed
    Failed,
    Closed,
}

/// Shared handle to one tile's content.
///
/// The entry is inserted into the cache map before its provider exists.
/// Whoever locks the state first while it is still pending constructs the
/// provider; concurrent callers block on the same lock and then see the
/// result, so each entry constructs at most once.
pub struct TileEntry {
    key: TileKey,
    state: Mutex<EntryState>,
}

impl TileEntry {
    pub(crate) fn new(key: TileKey) -> Self {
        Self {
            key,
            state: Mutex::new(EntryState::Pending),
        }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    fn state(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Construct the provider if nobody has yet, and return it.
    pub(crate) fn initialize(
        &self,
        factory: &dyn TileProviderFactory,
        cache_dir: &Path,
    ) -> Result<Arc<dyn TileProvider>, CacheError> {
        let mut state = self.state();
        match &*state {
            EntryState::Ready(provider) => return Ok(Arc::clone(provider)),
            EntryState::Failed => {
                return Err(CacheError::TileUnavailable {
                    key: self.key.clone(),
                    source: ProviderError::Unavailable(
                        "construction failed for a concurrent opener".to_string(),
                    ),
                })
            }
            EntryState::Closed => return Err(CacheError::Closed(self.key.clone())),
            EntryState::Pending => {}
        }

        match factory.create(&self.key, cache_dir) {
            Ok(provider) => {
                *state = EntryState::Ready(Arc::clone(&provider));
                Ok(provider)
            }
            Err(source) => {
                *state = EntryState::Failed;
                Err(CacheError::TileUnavailable {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }

    /// The constructed provider.
    ///
    /// Callers outside the cache go through [`super::TileLease`], which pins
    /// the entry against reclamation while reading.
    #[cfg(test)]
    pub(crate) fn provider(&self) -> Result<Arc<dyn TileProvider>, CacheError> {
        match &*self.state() {
            EntryState::Ready(provider) => Ok(Arc::clone(provider)),
            _ => Err(CacheError::Closed(self.key.clone())),
        }
    }

    /// Read a byte range through the provider, without a pin.
    #[cfg(test)]
    pub(crate) fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>, CacheError> {
        let provider = self.provider()?;
        provider
            .read_range(offset, len)
            .map_err(|source| CacheError::ReadFailed {
                key: self.key.clone(),
                source,
            })
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.state(), EntryState::Ready(_))
    }

    /// Mark the entry closed and close its provider.
    pub(crate) fn close(&self) {
        let previous = std::mem::replace(&mut *self.state(), EntryState::Closed);
        if let EntryState::Ready(provider) = previous {
            provider.close();
        }
    }
}

impl std::fmt::Debug for TileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileEntry")
            .field("key", &self.key)
            .field("ready", &self.is_ready())
            .finish()
    }
}
