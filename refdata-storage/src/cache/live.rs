//! Live cache of the latest active version per identity.
//!
//! The cache is a versioned snapshot, not an incrementally mutated map.
//! [`LiveCache::reload`] builds a complete new [`CacheSnapshot`] from a
//! fresh fetch and publishes it by swapping one shared handle. Readers clone
//! that handle and work against it, so a lookup never sees entries from two
//! different reloads. The handle is an [`ArcSwap`]: readers never take a
//! lock, and a reload in progress never delays a lookup.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::Utc;
use refdata_core::{EntityIdentity, RefDataEntity, RefDataResult, Timestamp};

use super::stats::{CacheCounters, CacheStats};
use crate::provider::SourceProvider;
use crate::source::RefDataSource;
use crate::typed::TypedSource;

/// Immutable contents of one reload.
#[derive(Debug)]
pub struct CacheSnapshot<T> {
    entries: HashMap<EntityIdentity, Arc<T>>,
    generation: u64,
    loaded_at: Option<Timestamp>,
}

impl<T> CacheSnapshot<T> {
    fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
            loaded_at: None,
        }
    }

    /// Entry for `identity`, if it had an active version at load time.
    pub fn get(&self, identity: &str) -> Option<&Arc<T>> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reload counter that produced this snapshot; 0 before the first reload.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When this snapshot was published.
    pub fn loaded_at(&self) -> Option<Timestamp> {
        self.loaded_at
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityIdentity, &Arc<T>)> {
        self.entries.iter()
    }
}

/// In-memory, reload-on-demand view of one entity type.
pub struct LiveCache<T: RefDataEntity> {
    source: Arc<dyn RefDataSource>,
    current: ArcSwap<CacheSnapshot<T>>,
    reload_guard: Mutex<()>,
    counters: CacheCounters,
}

impl<T: RefDataEntity> LiveCache<T> {
    /// Create an empty cache over `source`. Nothing is fetched until [`reload`](Self::reload).
    pub fn new(source: Arc<dyn RefDataSource>) -> Self {
        Self {
            source,
            current: ArcSwap::from_pointee(CacheSnapshot::empty()),
            reload_guard: Mutex::new(()),
            counters: CacheCounters::default(),
        }
    }

    /// Create an empty cache over the provider's storage port.
    pub fn from_provider(provider: &SourceProvider) -> Self {
        Self::new(provider.get())
    }

    /// Storage port this cache reads from.
    pub fn source(&self) -> &Arc<dyn RefDataSource> {
        &self.source
    }

    /// Replace the contents with a fresh fetch. Returns the new entry count.
    ///
    /// Reloads are serialized. On failure nothing is published and readers
    /// keep the previous snapshot.
    pub fn reload(&self) -> RefDataResult<usize> {
        let _reloading = self
            .reload_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let fetched = match TypedSource::<T>::fetch_latest(self.source.as_ref()) {
            Ok(fetched) => fetched,
            Err(e) => {
                self.counters.failed_reloads.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    table = T::TABLE,
                    error = %e,
                    "Live cache reload failed, keeping previous snapshot"
                );
                return Err(e);
            }
        };

        let entries = Self::index_by_identity(fetched);
        let generation = self.snapshot().generation + 1;
        let count = entries.len();
        let snapshot = Arc::new(CacheSnapshot {
            entries,
            generation,
            loaded_at: Some(Utc::now()),
        });

        self.current.store(snapshot);
        self.counters.reloads.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(table = T::TABLE, entries = count, generation, "Live cache reloaded");
        Ok(count)
    }

    /// Reload on behalf of a staleness check that needs current data.
    pub fn force_refresh(&self) -> RefDataResult<usize> {
        self.reload()
    }

    /// Entry for `identity` in the current snapshot. Never reloads.
    pub fn get(&self, identity: &str) -> Option<Arc<T>> {
        let found = self.snapshot().get(identity).cloned();
        self.counters.record_lookup(found.is_some());
        found
    }

    /// Currently published snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot<T>> {
        self.current.load_full()
    }

    /// Whether at least one reload has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.snapshot().generation > 0
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Identities present in the current snapshot.
    pub fn identities(&self) -> Vec<EntityIdentity> {
        self.snapshot().entries.keys().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let snapshot = self.snapshot();
        self.counters.snapshot(snapshot.len(), snapshot.generation)
    }

    /// Key fetched entities by identity, keeping the newest on duplicates.
    fn index_by_identity(fetched: Vec<T>) -> HashMap<EntityIdentity, Arc<T>> {
        let mut entries: HashMap<EntityIdentity, Arc<T>> = HashMap::with_capacity(fetched.len());
        for entity in fetched {
            match entries.entry(entity.identity()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(entity));
                }
                Entry::Occupied(mut slot) => {
                    tracing::warn!(
                        table = T::TABLE,
                        identity = %slot.key(),
                        "Duplicate identity in fetch result"
                    );
                    if entity.last_updated_ts() > slot.get().last_updated_ts() {
                        slot.insert(Arc::new(entity));
                    }
                }
            }
        }
        entries
    }
}

impl<T: RefDataEntity> std::fmt::Debug for LiveCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("LiveCache")
            .field("table", &T::TABLE)
            .field("entries", &snapshot.len())
            .field("generation", &snapshot.generation)
            .finish()
    }
}
