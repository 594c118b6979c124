//! Typed record mapper.
//!
//! Translates between raw [`FetchRecord`]/[`InsertRecord`] rows and typed
//! entities using the entity's schema and the payload codec.

use std::collections::HashMap;
use std::marker::PhantomData;

use refdata_core::{codec, EntityIdentity, RefDataEntity, RefDataResult, Timestamp, VersionMeta};

use crate::source::{FetchRecord, InsertRecord, RefDataSource};

/// Stateless mapper for one entity type.
pub struct TypedSource<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: RefDataEntity> TypedSource<T> {
    /// Fetch and decode the latest active version of every identity.
    pub fn fetch_latest(source: &dyn RefDataSource) -> RefDataResult<Vec<T>> {
        let records = source.fetch_latest(T::TABLE)?;
        tracing::debug!(table = T::TABLE, records = records.len(), "Fetched latest records");
        Self::parse_fetch_result(records)
    }

    /// Fetch and decode the view as of a historical point in time.
    ///
    /// This read path never touches a live cache.
    pub fn fetch_as_of(source: &dyn RefDataSource, ts: Timestamp) -> RefDataResult<Vec<T>> {
        let records = source.fetch_as_of(T::TABLE, ts)?;
        tracing::debug!(
            table = T::TABLE,
            as_of = %ts,
            records = records.len(),
            "Fetched historical records"
        );
        Self::parse_fetch_result(records)
    }

    /// Historical view keyed by identity.
    pub fn fetch_as_of_by_identity(
        source: &dyn RefDataSource,
        ts: Timestamp,
    ) -> RefDataResult<HashMap<EntityIdentity, T>> {
        Ok(Self::fetch_as_of(source, ts)?
            .into_iter()
            .map(|entity| (entity.identity(), entity))
            .collect())
    }

    /// Encode and submit entities as one batch, preserving each `active` flag.
    ///
    /// `writer` is the session's identity; whatever the entities carry in
    /// `last_updated_by` is ignored. An empty batch does not reach the store.
    pub fn insert<'a, I>(source: &dyn RefDataSource, entities: I, writer: &str) -> RefDataResult<()>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let records = entities
            .into_iter()
            .map(|entity| Self::to_insert_record(entity, writer))
            .collect::<RefDataResult<Vec<_>>>()?;

        if records.is_empty() {
            tracing::debug!(table = T::TABLE, "Skipping empty insert batch");
            return Ok(());
        }

        source.insert(T::TABLE, &records)
    }

    /// Build the raw insert row for one entity.
    pub fn to_insert_record(entity: &T, writer: &str) -> RefDataResult<InsertRecord> {
        Ok(InsertRecord {
            identity: entity.identity(),
            last_updated_by: writer.to_string(),
            active: entity.is_active(),
            blob: codec::serialize(entity)?,
        })
    }

    /// Decode fetched rows. Any undecodable row fails the whole fetch.
    fn parse_fetch_result(records: Vec<FetchRecord>) -> RefDataResult<Vec<T>> {
        records
            .into_iter()
            .map(|record| {
                let mut entity: T = codec::deserialize(&record.blob).map_err(|e| {
                    tracing::error!(
                        table = T::TABLE,
                        last_updated_by = %record.last_updated_by,
                        error = %e,
                        "Failed to decode fetched record"
                    );
                    e
                })?;
                // Anything the store returns from a fetch is an active version.
                *entity.meta_mut() =
                    VersionMeta::fetched(record.last_updated_ts, record.last_updated_by);
                Ok(entity)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySource;
    use chrono::{Duration, TimeZone, Utc};
    use refdata_core::{Clock, CodecError, ManualClock, RefDataError, StorageError, User};
    use std::sync::{Arc, Mutex};

    /// Source that replays fixed rows and records inserts.
    #[derive(Default)]
    struct StaticSource {
        rows: Vec<FetchRecord>,
        inserts: Mutex<Vec<(String, Vec<InsertRecord>)>>,
    }

    impl RefDataSource for StaticSource {
        fn fetch_latest(&self, _table: &str) -> RefDataResult<Vec<FetchRecord>> {
            Ok(self.rows.clone())
        }

        fn fetch_as_of(&self, _table: &str, _ts: Timestamp) -> RefDataResult<Vec<FetchRecord>> {
            Ok(self.rows.clone())
        }

        fn insert(&self, table: &str, records: &[InsertRecord]) -> RefDataResult<()> {
            self.inserts
                .lock()
                .map_err(|_| StorageError::LockPoisoned)?
                .push((table.to_string(), records.to_vec()));
            Ok(())
        }
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_fetch_latest_stamps_meta_from_storage() {
        let mut user = User::new("Evan", "James", "A1", 30);
        user.meta.active = false;
        user.meta.last_updated_by = Some("someone-else".to_string());
        let source = StaticSource {
            rows: vec![FetchRecord::new(t0(), "Evan", codec::serialize(&user).unwrap())],
            ..Default::default()
        };

        let fetched = TypedSource::<User>::fetch_latest(&source).unwrap();

        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].is_active());
        assert_eq!(fetched[0].last_updated_ts(), Some(t0()));
        assert_eq!(fetched[0].last_updated_by(), Some("Evan"));
        assert_eq!(fetched[0].desk, "A1");
    }

    #[test]
    fn test_corrupt_record_fails_whole_fetch() {
        let good = User::new("Evan", "James", "A1", 30);
        let source = StaticSource {
            rows: vec![
                FetchRecord::new(t0(), "Evan", codec::serialize(&good).unwrap()),
                FetchRecord::new(t0(), "Evan", b"{not json".to_vec()),
            ],
            ..Default::default()
        };

        let result = TypedSource::<User>::fetch_latest(&source);
        assert!(matches!(
            result,
            Err(RefDataError::Codec(CodecError::Deserialize { .. }))
        ));
    }

    #[test]
    fn test_insert_uses_session_writer_and_keeps_active_flag() {
        let source = StaticSource::default();
        let live = User::new("Evan", "James", "A1", 30);
        let mut deleted = User::new("Jeff", "Jones", "B2", 44);
        deleted.meta.active = false;
        deleted.meta.last_updated_by = Some("spoofed".to_string());

        TypedSource::<User>::insert(&source, [&live, &deleted], "session-writer").unwrap();

        let inserts = source.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        let (table, records) = &inserts[0];
        assert_eq!(table, "Users");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity, "EvanJames");
        assert!(records[0].active);
        assert_eq!(records[1].identity, "JeffJones");
        assert!(!records[1].active);
        assert!(records.iter().all(|r| r.last_updated_by == "session-writer"));
    }

    #[test]
    fn test_empty_insert_skips_store() {
        let source = StaticSource::default();
        TypedSource::<User>::insert(&source, &Vec::<User>::new(), "w").unwrap();
        assert!(source.inserts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_as_of_by_identity_bypasses_superseded_versions() {
        let clock = Arc::new(ManualClock::new(t0()));
        let source = InMemorySource::with_clock(clock.clone());

        TypedSource::<User>::insert(&source, &[User::new("Evan", "James", "A1", 30)], "w")
            .unwrap();
        let before_move = clock.now() + Duration::minutes(30);
        clock.advance(Duration::hours(1));
        TypedSource::<User>::insert(&source, &[User::new("Evan", "James", "C3", 31)], "w")
            .unwrap();

        let then = TypedSource::<User>::fetch_as_of_by_identity(&source, before_move).unwrap();
        assert_eq!(then["EvanJames"].desk, "A1");

        let now = TypedSource::<User>::fetch_latest(&source).unwrap();
        assert_eq!(now[0].desk, "C3");
    }
}
