//! In-memory append-only backing store.
//!
//! Every insert appends a new version stamped with a strictly increasing
//! version time; nothing is ever overwritten. Fetches reconstruct "latest
//! active version per identity" from the full history, optionally bounded
//! by an as-of time, the way a column store would with an argMax query.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use refdata_core::{
    timestamp_from_nanos, timestamp_to_nanos, Blob, Clock, EntityIdentity, RefDataResult,
    StorageError, SystemClock, Timestamp,
};

use crate::source::{FetchRecord, InsertRecord, RefDataSource};

/// One stored version of an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    pub identity: EntityIdentity,
    /// Version time in nanoseconds since the Unix epoch.
    pub version_nanos: i64,
    pub last_updated_by: String,
    pub active: bool,
    pub blob: Blob,
}

impl StoredVersion {
    /// Version time as a timestamp.
    pub fn last_updated_ts(&self) -> Timestamp {
        timestamp_from_nanos(self.version_nanos)
    }

    fn to_fetch_record(&self) -> FetchRecord {
        FetchRecord::new(
            self.last_updated_ts(),
            self.last_updated_by.clone(),
            self.blob.clone(),
        )
    }
}

#[derive(Debug, Default)]
struct Tables {
    versions: HashMap<String, Vec<StoredVersion>>,
    last_assigned_nanos: Option<i64>,
}

/// Thread-safe in-memory [`RefDataSource`].
pub struct InMemorySource {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySource")
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}

impl InMemorySource {
    /// Create an empty store stamping versions with the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping versions with the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }

    /// Number of versions ever written to `table`.
    pub fn version_count(&self, table: &str) -> RefDataResult<usize> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables.versions.get(table).map_or(0, Vec::len))
    }

    /// Every version of one identity, oldest first, including soft deletes.
    pub fn history(&self, table: &str, identity: &str) -> RefDataResult<Vec<StoredVersion>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(tables
            .versions
            .get(table)
            .map(|versions| {
                versions
                    .iter()
                    .filter(|v| v.identity == identity)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Latest active version per identity among versions at or before `upto_nanos`.
    fn latest_active(&self, table: &str, upto_nanos: Option<i64>) -> RefDataResult<Vec<FetchRecord>> {
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        let Some(versions) = tables.versions.get(table) else {
            return Ok(Vec::new());
        };

        // Versions are appended in version-time order, so the last one seen wins.
        let mut latest: BTreeMap<&str, &StoredVersion> = BTreeMap::new();
        for version in versions
            .iter()
            .filter(|v| upto_nanos.map_or(true, |upto| v.version_nanos <= upto))
        {
            latest.insert(version.identity.as_str(), version);
        }

        Ok(latest
            .into_values()
            .filter(|v| v.active)
            .map(StoredVersion::to_fetch_record)
            .collect())
    }
}

impl RefDataSource for InMemorySource {
    fn fetch_latest(&self, table: &str) -> RefDataResult<Vec<FetchRecord>> {
        self.latest_active(table, None)
    }

    fn fetch_as_of(&self, table: &str, ts: Timestamp) -> RefDataResult<Vec<FetchRecord>> {
        self.latest_active(table, Some(timestamp_to_nanos(ts)))
    }

    fn insert(&self, table: &str, records: &[InsertRecord]) -> RefDataResult<()> {
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
        let now = timestamp_to_nanos(self.clock.now());
        let mut next = match tables.last_assigned_nanos {
            Some(last) if last >= now => last.saturating_add(1),
            _ => now,
        };

        let stamped: Vec<StoredVersion> = records
            .iter()
            .map(|record| {
                let version = StoredVersion {
                    identity: record.identity.clone(),
                    version_nanos: next,
                    last_updated_by: record.last_updated_by.clone(),
                    active: record.active,
                    blob: record.blob.clone(),
                };
                next = next.saturating_add(1);
                version
            })
            .collect();

        if let Some(last) = stamped.last() {
            tables.last_assigned_nanos = Some(last.version_nanos);
        }
        tables
            .versions
            .entry(table.to_string())
            .or_default()
            .extend(stamped);

        tracing::debug!(table, records = records.len(), "Appended versions");
        Ok(())
    }
}
