//! Reference Data Test Utilities
//!
//! Shared test infrastructure for the reference-data workspace:
//! - A scriptable, call-recording mock storage port
//! - Proptest generators for entity types
//! - Test fixtures for common scenarios
//! - Custom assertions for reference-data results

pub use refdata_storage::{
    FetchRecord, InMemorySource, InsertOutcome, InsertRecord, LiveCache, RefData,
    RefDataInserter, RefDataSource, SourceProvider, TypedSource,
};

pub use refdata_core::{
    codec, ConfigError, Desk, ManualClock, RefDataConfig, RefDataEntity, RefDataError,
    RefDataResult, StaleCheck, StorageError, Timestamp, User,
};

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

// ============================================================================
// TRACING
// ============================================================================

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a test-writer tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to debug output for the reference-data crates.
pub fn init_test_tracing() {
    TRACING.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("refdata_storage=debug,refdata_core=debug,warn"));
        // Another harness may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// MOCK SOURCE
// ============================================================================

/// A call observed by [`MockSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    FetchLatest { table: String },
    FetchAsOf { table: String, ts: Timestamp },
    Insert { table: String, records: Vec<InsertRecord> },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<SourceCall>,
    latest: HashMap<String, Vec<FetchRecord>>,
    latest_queue: HashMap<String, VecDeque<RefDataResult<Vec<FetchRecord>>>>,
    as_of: HashMap<String, Vec<FetchRecord>>,
    fetch_failure: Option<RefDataError>,
    insert_failure: Option<RefDataError>,
}

/// Storage port that records every call and replays scripted responses.
///
/// Fetch responses come from, in order: an injected fetch failure, the
/// per-table one-shot queue, then the per-table standing response (empty if
/// none was set). Inserts are recorded and succeed unless a failure was
/// injected; they never change what fetches return.
#[derive(Debug, Default)]
pub struct MockSource {
    state: Mutex<MockState>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Standing response for `fetch_latest(table)`.
    pub fn set_latest(&self, table: &str, records: Vec<FetchRecord>) {
        self.state().latest.insert(table.to_string(), records);
    }

    /// One-shot response for the next `fetch_latest(table)`.
    pub fn push_latest(&self, table: &str, response: RefDataResult<Vec<FetchRecord>>) {
        self.state()
            .latest_queue
            .entry(table.to_string())
            .or_default()
            .push_back(response);
    }

    /// Standing response for `fetch_as_of(table, _)`, whatever the timestamp.
    pub fn set_as_of(&self, table: &str, records: Vec<FetchRecord>) {
        self.state().as_of.insert(table.to_string(), records);
    }

    /// Make every fetch fail with `error` until cleared with `None`.
    pub fn fail_fetches(&self, error: Option<RefDataError>) {
        self.state().fetch_failure = error;
    }

    /// Make every insert fail with `error` until cleared with `None`.
    pub fn fail_inserts(&self, error: Option<RefDataError>) {
        self.state().insert_failure = error;
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<SourceCall> {
        self.state().calls.clone()
    }

    pub fn fetch_latest_calls(&self) -> usize {
        self.count(|call| matches!(call, SourceCall::FetchLatest { .. }))
    }

    pub fn fetch_as_of_calls(&self) -> usize {
        self.count(|call| matches!(call, SourceCall::FetchAsOf { .. }))
    }

    pub fn insert_calls(&self) -> usize {
        self.count(|call| matches!(call, SourceCall::Insert { .. }))
    }

    /// Tables and records of every insert call, in order.
    pub fn inserts(&self) -> Vec<(String, Vec<InsertRecord>)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                SourceCall::Insert { table, records } => Some((table.clone(), records.clone())),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&SourceCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| pred(call)).count()
    }
}

impl RefDataSource for MockSource {
    fn fetch_latest(&self, table: &str) -> RefDataResult<Vec<FetchRecord>> {
        let mut state = self.state();
        state.calls.push(SourceCall::FetchLatest {
            table: table.to_string(),
        });
        if let Some(err) = state.fetch_failure.clone() {
            return Err(err);
        }
        if let Some(response) = state.latest_queue.get_mut(table).and_then(VecDeque::pop_front) {
            return response;
        }
        Ok(state.latest.get(table).cloned().unwrap_or_default())
    }

    fn fetch_as_of(&self, table: &str, ts: Timestamp) -> RefDataResult<Vec<FetchRecord>> {
        let mut state = self.state();
        state.calls.push(SourceCall::FetchAsOf {
            table: table.to_string(),
            ts,
        });
        if let Some(err) = state.fetch_failure.clone() {
            return Err(err);
        }
        Ok(state.as_of.get(table).cloned().unwrap_or_default())
    }

    fn insert(&self, table: &str, records: &[InsertRecord]) -> RefDataResult<()> {
        let mut state = self.state();
        state.calls.push(SourceCall::Insert {
            table: table.to_string(),
            records: records.to_vec(),
        });
        match state.insert_failure.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating reference-data entity types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp within 2020-2030, whole seconds.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate a short capitalised name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,10}"
    }

    /// Generate a desk code such as `A1`.
    pub fn arb_desk_code() -> impl Strategy<Value = String> {
        "[A-Z][0-9]"
    }

    /// Generate a live, never-stored User.
    pub fn arb_user() -> impl Strategy<Value = User> {
        (arb_name(), arb_name(), arb_desk_code(), 18u32..80)
            .prop_map(|(first, sur, desk, age)| User::new(first, sur, desk, age))
    }

    /// Generate a live, never-stored Desk.
    pub fn arb_desk() -> impl Strategy<Value = Desk> {
        (
            arb_desk_code(),
            "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,12})?",
            prop_oneof![Just("EMEA"), Just("AMER"), Just("APAC")],
        )
            .prop_map(|(code, name, region)| Desk::new(code, name, region))
    }

    /// Generate a batch of users with distinct identities.
    pub fn arb_distinct_users(max: usize) -> impl Strategy<Value = Vec<User>> {
        prop::collection::vec(arb_user(), 0..=max).prop_map(|users| {
            let mut seen = std::collections::HashSet::new();
            users
                .into_iter()
                .filter(|user| seen.insert(user.identity()))
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities and records for common test scenarios.

    use super::*;

    /// A live user whose observed version time is `ts`.
    pub fn make_test_user(firstname: &str, surname: &str, ts: Option<Timestamp>) -> User {
        let mut user = User::new(firstname, surname, "A1", 30);
        user.meta.last_updated_ts = ts;
        user
    }

    /// A live desk whose observed version time is `ts`.
    pub fn make_test_desk(code: &str, ts: Option<Timestamp>) -> Desk {
        let mut desk = Desk::new(code, format!("Desk {}", code), "EMEA");
        desk.meta.last_updated_ts = ts;
        desk
    }

    /// The row a store would return for `entity` written by `author` at `ts`.
    ///
    /// Panics if the entity cannot be encoded; fixtures are test-only.
    pub fn fetch_record_for<T: RefDataEntity>(entity: &T, author: &str, ts: Timestamp) -> FetchRecord {
        let blob = codec::serialize(entity).expect("fixture entity must encode");
        FetchRecord::new(ts, author, blob)
    }

    /// A fixed reference instant for deterministic tests.
    pub fn t0() -> Timestamp {
        chrono::DateTime::from_timestamp(1_717_232_400, 0).unwrap_or_else(chrono::Utc::now)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for reference-data results.

    use super::*;

    /// Assert that a RefDataResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &RefDataResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a RefDataResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &RefDataResult<T>) {
        match result {
            Err(RefDataError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a RefDataResult is a Codec error.
    #[track_caller]
    pub fn assert_codec_error<T: std::fmt::Debug>(result: &RefDataResult<T>) {
        match result {
            Err(RefDataError::Codec(_)) => {}
            other => panic!("Expected Codec error, got: {:?}", other),
        }
    }

    /// Assert that an insert produced exactly one stale rejection per listed identity.
    #[track_caller]
    pub fn assert_rejected_stale(outcomes: &[InsertOutcome], identities: &[&str]) {
        let rejected: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.is_stale())
            .map(InsertOutcome::identity)
            .collect();
        assert_eq!(rejected, identities, "unexpected stale rejections in {:?}", outcomes);
    }
}
