//! Entity schema contract for reference-data kinds.
//!
//! Every reference-data type declares where it lives ([`RefDataEntity::TABLE`])
//! and how its natural key is spelled ([`RefDataEntity::identity`]). Because
//! the table is an associated constant, a type without a schema simply does
//! not satisfy the bound and cannot be handed to the storage layer.
//!
//! Version metadata ([`VersionMeta`]) travels alongside the business fields
//! but is never part of the serialized payload: the read path restores it
//! from storage metadata on every fetch.

use serde::{de::DeserializeOwned, Serialize};

use crate::{EntityIdentity, Timestamp};

/// Per-version bookkeeping attached to every reference-data entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMeta {
    /// Whether this version is live. `false` marks a soft delete.
    pub active: bool,
    /// Version time assigned by the store.
    ///
    /// On the write path this is the intended version time of this write and
    /// is what the staleness check compares against the cache; `None` means
    /// "now". An entity read back from the cache still carries the cached
    /// version's time and is therefore stale as-is: call
    /// [`RefDataEntity::as_new_version`] (or clear or advance this field)
    /// before re-inserting it.
    pub last_updated_ts: Option<Timestamp>,
    /// Writer identity recorded by the store.
    pub last_updated_by: Option<String>,
}

impl VersionMeta {
    /// Metadata for a fresh, live record that has never been stored.
    pub fn new_active() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Metadata as stamped by the read path for a fetched record.
    pub fn fetched(last_updated_ts: Timestamp, last_updated_by: impl Into<String>) -> Self {
        Self {
            active: true,
            last_updated_ts: Some(last_updated_ts),
            last_updated_by: Some(last_updated_by.into()),
        }
    }

    /// Drop the stored version stamp, keeping the active flag.
    pub fn clear_version(&mut self) {
        self.last_updated_ts = None;
        self.last_updated_by = None;
    }
}

/// Schema trait implemented by each reference-data kind.
///
/// # Implementation Requirements
///
/// - `TABLE` is the storage table name and is constant for the type
/// - `identity()` must be deterministic and derived from business fields only;
///   it must not look at [`VersionMeta`]
/// - `meta()` / `meta_mut()` expose the version metadata field, which should be
///   `#[serde(skip)]` so it never leaks into the payload
pub trait RefDataEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Storage table holding this entity's versions.
    const TABLE: &'static str;

    /// Stable identity derived from the natural-key fields.
    fn identity(&self) -> EntityIdentity;

    /// Version metadata for this instance.
    fn meta(&self) -> &VersionMeta;

    /// Mutable version metadata for this instance.
    fn meta_mut(&mut self) -> &mut VersionMeta;

    /// Whether this version is live.
    fn is_active(&self) -> bool {
        self.meta().active
    }

    /// Version time, if known.
    fn last_updated_ts(&self) -> Option<Timestamp> {
        self.meta().last_updated_ts
    }

    /// Writer of this version, if known.
    fn last_updated_by(&self) -> Option<&str> {
        self.meta().last_updated_by.as_deref()
    }

    /// Copy of this entity to edit and insert as a new version.
    ///
    /// The copy carries no version stamp, so the insert path stamps it with
    /// the current time.
    fn as_new_version(&self) -> Self {
        let mut next = self.clone();
        next.meta_mut().clear_version();
        next
    }

    /// Storage table name, for call sites that only hold a value.
    fn table() -> &'static str {
        Self::TABLE
    }
}
