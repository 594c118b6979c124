//! Insert coordinator with optimistic staleness checks.
//!
//! A write is accepted unless the writer's own live cache already holds a
//! version of the same identity that is at least as new as the write. The
//! check and the subsequent insert are not one atomic unit: two writers can
//! both pass against a cache that has not yet seen the other's write, and
//! both versions land in the store.

use std::sync::Arc;

use refdata_core::{
    Clock, EntityIdentity, RefDataConfig, RefDataEntity, RefDataResult, StaleCheck, SystemClock,
    Timestamp,
};

use crate::cache::{CacheSnapshot, LiveCache};
use crate::provider::SourceProvider;
use crate::source::RefDataSource;
use crate::typed::TypedSource;

/// Per-entity result of an insert call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Submitted to the store as part of the batch.
    Inserted { identity: EntityIdentity },
    /// Not submitted: the cache already holds a version at least this new.
    RejectedStale {
        identity: EntityIdentity,
        cached_ts: Timestamp,
        attempted_ts: Timestamp,
    },
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, InsertOutcome::RejectedStale { .. })
    }

    pub fn identity(&self) -> &str {
        match self {
            InsertOutcome::Inserted { identity } => identity,
            InsertOutcome::RejectedStale { identity, .. } => identity,
        }
    }
}

/// Writes new entity versions through a storage port.
pub struct RefDataInserter {
    source: Arc<dyn RefDataSource>,
    config: RefDataConfig,
    clock: Arc<dyn Clock>,
}

impl RefDataInserter {
    /// Create an inserter for one writer session. Fails if `config` is invalid.
    pub fn new(source: Arc<dyn RefDataSource>, config: RefDataConfig) -> RefDataResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Create an inserter over the provider's storage port.
    pub fn from_provider(provider: &SourceProvider, config: RefDataConfig) -> RefDataResult<Self> {
        Self::new(provider.get(), config)
    }

    /// Use `clock` for "now" when an entity carries no intended version time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stale_check(&self) -> StaleCheck {
        self.config.stale_check
    }

    pub fn writer(&self) -> &str {
        &self.config.writer
    }

    /// Insert a batch, returning one outcome per entity in input order.
    ///
    /// Entities that pass the configured staleness check are submitted
    /// together in a single storage call. Storage failures are propagated
    /// unchanged; stale rejections are reported in the outcomes.
    pub fn insert<T: RefDataEntity>(
        &self,
        entities: &[T],
        cache: &LiveCache<T>,
    ) -> RefDataResult<Vec<InsertOutcome>> {
        let policy = self.config.stale_check;
        if policy.forces_refresh() {
            cache.force_refresh()?;
        }
        // One snapshot for the whole batch, so every entity is judged against the same view.
        let snapshot = policy.consults_cache().then(|| cache.snapshot());
        let now = self.clock.now();

        let mut outcomes = Vec::with_capacity(entities.len());
        let mut accepted = Vec::with_capacity(entities.len());
        for entity in entities {
            let identity = entity.identity();
            let attempted_ts = entity.last_updated_ts().unwrap_or(now);
            match snapshot
                .as_deref()
                .and_then(|snap| Self::superseding_version(snap, &identity, attempted_ts))
            {
                Some(cached_ts) => {
                    tracing::warn!(
                        table = T::TABLE,
                        identity = %identity,
                        cached_ts = %cached_ts,
                        attempted_ts = %attempted_ts,
                        "Rejected stale insert"
                    );
                    outcomes.push(InsertOutcome::RejectedStale {
                        identity,
                        cached_ts,
                        attempted_ts,
                    });
                }
                None => {
                    accepted.push(entity);
                    outcomes.push(InsertOutcome::Inserted { identity });
                }
            }
        }

        TypedSource::<T>::insert(self.source.as_ref(), accepted.iter().copied(), self.writer())?;

        tracing::info!(
            table = T::TABLE,
            policy = %policy,
            submitted = accepted.len(),
            rejected = entities.len() - accepted.len(),
            "Inserted reference data"
        );
        Ok(outcomes)
    }

    /// Insert one entity. `Ok(false)` means it was rejected as stale.
    pub fn insert_one<T: RefDataEntity>(
        &self,
        entity: &T,
        cache: &LiveCache<T>,
    ) -> RefDataResult<bool> {
        let outcomes = self.insert(std::slice::from_ref(entity), cache)?;
        Ok(outcomes.iter().all(InsertOutcome::is_inserted))
    }

    /// Version time of a cached entry that makes a write at `attempted_ts` stale.
    fn superseding_version<T: RefDataEntity>(
        snapshot: &CacheSnapshot<T>,
        identity: &str,
        attempted_ts: Timestamp,
    ) -> Option<Timestamp> {
        snapshot
            .get(identity)
            .and_then(|cached| cached.last_updated_ts())
            .filter(|cached_ts| *cached_ts >= attempted_ts)
    }
}

impl std::fmt::Debug for RefDataInserter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefDataInserter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
