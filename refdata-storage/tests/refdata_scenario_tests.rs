//! End-to-end tests for the read cache and insert path over a mocked store

use std::sync::Arc;

use chrono::Duration;
use refdata_storage::*;
use refdata_test_utils::assertions::*;
use refdata_test_utils::fixtures::*;
use refdata_test_utils::{init_test_tracing, MockSource, SourceCall, StorageError, User};

fn session(mock: &Arc<MockSource>, policy: StaleCheck) -> RefDataResult<RefDataInserter> {
    RefDataInserter::new(
        mock.clone(),
        RefDataConfig::new("Evan").with_stale_check(policy),
    )
}

#[test]
fn insert_then_reload_makes_user_visible() -> RefDataResult<()> {
    init_test_tracing();
    let mock = Arc::new(MockSource::new());
    let cache = Arc::new(LiveCache::<User>::new(mock.clone()));
    let users = RefData::new(cache.clone());

    assert!(users.get("EvanJames").is_none());

    let evan = make_test_user("Evan", "James", None);
    let inserted = session(&mock, StaleCheck::None)?.insert_one(&evan, &cache)?;
    assert!(inserted);

    let inserts = mock.inserts();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].0, "Users");
    assert_eq!(inserts[0].1[0].identity, "EvanJames");
    assert_eq!(inserts[0].1[0].last_updated_by, "Evan");

    mock.set_latest("Users", vec![fetch_record_for(&evan, "Evan", t0())]);
    cache.reload()?;

    let cached = users.get("EvanJames").expect("user visible after reload");
    assert_eq!(cached.firstname, "Evan");
    assert_eq!(cached.last_updated_by(), Some("Evan"));
    assert_eq!(cached.last_updated_ts(), Some(t0()));
    Ok(())
}

#[test]
fn stale_insert_rejected_after_forced_refresh() -> RefDataResult<()> {
    init_test_tracing();
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    let current = make_test_user("Evan", "James", None);
    mock.set_latest("Users", vec![fetch_record_for(&current, "Jeff", t0())]);

    let stale = make_test_user("Evan", "James", Some(t0() - Duration::hours(1)));
    let inserter = session(&mock, StaleCheck::FromLiveCacheForceRefresh)?;
    let outcomes = inserter.insert(&[stale.clone()], &cache)?;

    assert_rejected_stale(&outcomes, &["EvanJames"]);
    assert!(!inserter.insert_one(&stale, &cache)?);
    assert_eq!(mock.insert_calls(), 0);
    // One forced reload per insert call.
    assert_eq!(mock.fetch_latest_calls(), 2);
    Ok(())
}

#[test]
fn repeated_reload_keeps_one_entry() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    let evan = make_test_user("Evan", "James", None);
    mock.set_latest("Users", vec![fetch_record_for(&evan, "Evan", t0())]);

    assert_eq!(cache.reload()?, 1);
    let first = cache.get("EvanJames").expect("loaded");
    assert_eq!(cache.reload()?, 1);
    let second = cache.get("EvanJames").expect("still loaded");

    assert_eq!(*first, *second);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().generation, 2);
    Ok(())
}

#[test]
fn from_live_cache_does_not_fetch() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    mock.set_latest(
        "Users",
        vec![fetch_record_for(&make_test_user("Evan", "James", None), "Jeff", t0())],
    );
    cache.reload()?;

    let newer = make_test_user("Evan", "James", Some(t0() + Duration::minutes(5)));
    assert!(session(&mock, StaleCheck::FromLiveCache)?.insert_one(&newer, &cache)?);
    assert_eq!(mock.fetch_latest_calls(), 1);
    assert_eq!(mock.insert_calls(), 1);
    Ok(())
}

#[test]
fn storage_failure_is_not_a_stale_rejection() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    mock.fail_inserts(Some(
        StorageError::InsertRejected {
            table: "Users".to_string(),
            reason: "read-only".to_string(),
        }
        .into(),
    ));

    let result = session(&mock, StaleCheck::None)?
        .insert_one(&make_test_user("Evan", "James", None), &cache);
    assert_storage_error(&result);
    assert_eq!(mock.insert_calls(), 1);
    Ok(())
}

#[test]
fn forced_refresh_failure_aborts_insert() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    mock.fail_fetches(Some(
        StorageError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into(),
    ));

    let result = session(&mock, StaleCheck::FromLiveCacheForceRefresh)?
        .insert_one(&make_test_user("Evan", "James", None), &cache);
    assert_storage_error(&result);
    assert_eq!(mock.insert_calls(), 0);
    Ok(())
}

#[test]
fn failed_reload_keeps_previous_snapshot() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    mock.set_latest(
        "Users",
        vec![fetch_record_for(&make_test_user("Evan", "James", None), "Evan", t0())],
    );
    cache.reload()?;

    mock.push_latest(
        "Users",
        Err(StorageError::Unavailable {
            reason: "timeout".to_string(),
        }
        .into()),
    );
    assert_storage_error(&cache.reload());

    assert!(cache.get("EvanJames").is_some());
    let stats = cache.stats();
    assert_eq!(stats.generation, 1);
    assert_eq!(stats.failed_reloads, 1);
    Ok(())
}

#[test]
fn undecodable_row_fails_the_whole_reload() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    mock.set_latest(
        "Users",
        vec![
            fetch_record_for(&make_test_user("Evan", "James", None), "Evan", t0()),
            FetchRecord::new(t0(), "Evan", b"not json".to_vec()),
        ],
    );

    assert_codec_error(&cache.reload());
    assert!(!cache.is_loaded());
    Ok(())
}

#[test]
fn as_of_fetch_bypasses_cache() -> RefDataResult<()> {
    let mock = Arc::new(MockSource::new());
    let cache = LiveCache::<User>::new(mock.clone());
    mock.set_as_of(
        "Users",
        vec![fetch_record_for(&make_test_user("Evan", "James", None), "Evan", t0())],
    );

    let as_of = t0() + Duration::days(1);
    let past = TypedSource::<User>::fetch_as_of_by_identity(mock.as_ref(), as_of)?;

    assert!(past.contains_key("EvanJames"));
    assert!(!cache.is_loaded());
    assert_eq!(
        mock.calls(),
        vec![SourceCall::FetchAsOf {
            table: "Users".to_string(),
            ts: as_of,
        }]
    );
    Ok(())
}

#[test]
fn provider_swap_redirects_new_consumers() -> RefDataResult<()> {
    let mut provider = SourceProvider::in_memory();
    let mock = Arc::new(MockSource::new());
    let handed_out: Arc<dyn RefDataSource> = mock.clone();
    provider.set_factory(move || Arc::clone(&handed_out));

    let cache = LiveCache::<User>::from_provider(&provider);
    let inserter = RefDataInserter::from_provider(&provider, RefDataConfig::new("Evan"))?;
    inserter.insert_one(&make_test_user("Evan", "James", None), &cache)?;
    cache.reload()?;

    assert_eq!(mock.insert_calls(), 1);
    assert_eq!(mock.fetch_latest_calls(), 1);
    Ok(())
}
