//! Storage port for raw reference-data records.

use refdata_core::{Blob, EntityIdentity, RefDataResult, Timestamp};

/// One row returned by a fetch: a version's metadata plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub last_updated_ts: Timestamp,
    pub last_updated_by: String,
    pub blob: Blob,
}

impl FetchRecord {
    pub fn new(last_updated_ts: Timestamp, last_updated_by: impl Into<String>, blob: Blob) -> Self {
        Self {
            last_updated_ts,
            last_updated_by: last_updated_by.into(),
            blob,
        }
    }
}

/// One row submitted on insert. The store assigns the version time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRecord {
    pub identity: EntityIdentity,
    pub last_updated_by: String,
    pub active: bool,
    pub blob: Blob,
}

/// Append-only, timestamped backing store keyed by table name.
///
/// Implementations must be thread-safe; the live cache and the insert path
/// share one instance across threads.
pub trait RefDataSource: Send + Sync {
    /// Latest version of every identity whose latest version is active.
    ///
    /// Identities whose latest version is a soft delete are omitted.
    /// Order is unspecified.
    fn fetch_latest(&self, table: &str) -> RefDataResult<Vec<FetchRecord>>;

    /// Same view as [`fetch_latest`](Self::fetch_latest), reconstructed as of `ts`.
    fn fetch_as_of(&self, table: &str, ts: Timestamp) -> RefDataResult<Vec<FetchRecord>>;

    /// Append one new version per record. Never overwrites earlier versions.
    fn insert(&self, table: &str, records: &[InsertRecord]) -> RefDataResult<()>;
}
