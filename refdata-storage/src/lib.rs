//! Reference Data Storage - Storage Port, Live Cache and Insert Coordinator
//!
//! Defines the backing-store abstraction for versioned reference data, the
//! typed mapping between entities and stored blobs, a process-local live
//! cache with snapshot isolation, and the writer-side insert path with
//! optimistic staleness checks.

pub mod cache;
pub mod inserter;
pub mod memory;
pub mod provider;
pub mod source;
pub mod typed;

pub use cache::{CacheSnapshot, CacheStats, LiveCache, RefData};
pub use inserter::{InsertOutcome, RefDataInserter};
pub use memory::{InMemorySource, StoredVersion};
pub use provider::{SourceFactory, SourceProvider};
pub use source::{FetchRecord, InsertRecord, RefDataSource};
pub use typed::TypedSource;

pub use refdata_core::{RefDataConfig, RefDataEntity, RefDataError, RefDataResult, StaleCheck};
