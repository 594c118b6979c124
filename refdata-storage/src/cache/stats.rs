//! Live cache usage counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by a live cache. Relaxed ordering: these are metrics.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub reloads: AtomicU64,
    pub failed_reloads: AtomicU64,
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheCounters {
    pub fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, entry_count: usize, generation: u64) -> CacheStats {
        CacheStats {
            reloads: self.reloads.load(Ordering::Relaxed),
            failed_reloads: self.failed_reloads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entry_count as u64,
            generation,
        }
    }
}

/// Statistics about live cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Successful reloads since construction.
    pub reloads: u64,
    /// Reloads that failed and left the previous snapshot in place.
    pub failed_reloads: u64,
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries in the currently published snapshot.
    pub entry_count: u64,
    /// Generation of the currently published snapshot (0 = never loaded).
    pub generation: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
