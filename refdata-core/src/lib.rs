//! Reference Data Core - Entity Schema and Shared Types
//!
//! Pure data structures and contracts. All other crates depend on this.
//! Storage access, caching and the insert path live in `refdata-storage`.

pub mod codec;
pub mod config;
pub mod entities;
pub mod entity;
pub mod error;
pub mod identity;

pub use config::{RefDataConfig, StaleCheck, DEFAULT_WRITER};
pub use entities::{Desk, User};
pub use entity::{RefDataEntity, VersionMeta};
pub use error::{CodecError, ConfigError, RefDataError, RefDataResult, StorageError};
pub use identity::{
    timestamp_from_nanos, timestamp_to_nanos, Blob, Clock, EntityIdentity, ManualClock,
    SystemClock, Timestamp,
};
