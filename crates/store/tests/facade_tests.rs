//! Integration tests for the best-effort `StateCache` facade.

mod common;

use chaincache_core::config::{CacheConfig, StoreConfig};
use chaincache_core::{KeyPath, StateValue, U256};
use chaincache_store::{CacheError, EntryFilter, StateCache};
use common::TestCache;
use common::fixtures::{FORK_A, FORK_B, events, numbers};
use std::path::PathBuf;

#[tokio::test]
async fn test_facade_round_trip() {
    let test_cache = TestCache::in_memory().await.unwrap();
    let cache = test_cache.cache();

    cache
        .set_cached_state(FORK_A, ["0xabc", "debt"], U256::from(10u64).pow(U256::from(40u64)))
        .await
        .unwrap();
    assert_eq!(
        cache
            .get_cached_state(FORK_A, ["0xabc", "debt"])
            .await
            .and_then(|v| v.as_wide()),
        Some(U256::from(10u64).pow(U256::from(40u64)))
    );

    let history = events(0, 150);
    cache
        .append_cached_array(FORK_A, ["0xabc", "events"], &history[..100])
        .await
        .unwrap();
    cache
        .append_cached_array(FORK_A, ["0xabc", "events"], &history[100..])
        .await
        .unwrap();
    assert_eq!(
        cache
            .get_cached_array_length(FORK_A, ["0xabc", "events"])
            .await,
        150
    );
    assert_eq!(
        cache
            .get_cached_array_range(FORK_A, ["0xabc", "events"], 90, Some(110))
            .await,
        history[90..110]
    );
    assert_eq!(
        cache.read_cached_array(FORK_A, ["0xabc", "events"]).await,
        history
    );

    cache
        .set_cached_array(FORK_A, ["0xabc", "events"], &numbers(&[1]))
        .await
        .unwrap();
    assert_eq!(
        cache
            .get_cached_array_length(FORK_A, ["0xabc", "events"])
            .await,
        1
    );

    let summary = cache.get_cache_entries_summary().await;
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].entry_count, 2);

    let listed = cache
        .list_cache_entries(&EntryFilter::all().protocol(FORK_A))
        .await;
    assert_eq!(listed.len(), 2);

    assert_eq!(
        cache.clear_cached_state_for_base_key(FORK_A, "0xabc").await,
        2
    );
    assert!(cache.get_cached_state(FORK_A, ["0xabc", "debt"]).await.is_none());
}

#[tokio::test]
async fn test_clear_cached_state_for_protocol() {
    let test_cache = TestCache::in_memory().await.unwrap();
    let cache = test_cache.cache();

    cache.set_cached_state(FORK_A, "u1", 1u64).await.unwrap();
    cache.set_cached_state(FORK_B, "u1", 2u64).await.unwrap();

    cache.clear_cached_state(FORK_A).await;

    assert!(cache.get_cached_state(FORK_A, "u1").await.is_none());
    assert_eq!(
        cache.get_cached_state(FORK_B, "u1").await,
        Some(StateValue::from(2u64))
    );
}

#[tokio::test]
async fn test_empty_key_path_write_is_raised() {
    let test_cache = TestCache::in_memory().await.unwrap();
    let cache = test_cache.cache();

    let err = cache
        .set_cached_state(FORK_A, KeyPath::default(), 1u64)
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::EmptyKeyPath));

    let err = cache
        .append_cached_array(FORK_A, Vec::<String>::new(), &numbers(&[1]))
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::EmptyKeyPath));

    let err = cache
        .set_cached_array(FORK_A, KeyPath::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::EmptyKeyPath));

    // Reads are a quiet miss.
    assert!(cache.get_cached_state(FORK_A, KeyPath::default()).await.is_none());
    assert_eq!(
        cache
            .get_cached_array_length(FORK_A, KeyPath::default())
            .await,
        0
    );
}

#[tokio::test]
async fn test_store_failures_degrade_after_destroy() {
    let test_cache = TestCache::in_memory().await.unwrap();
    let cache = test_cache.cache();

    cache.set_cached_state(FORK_A, "u1", 1u64).await.unwrap();
    cache.delete_database().await.expect("destroy failed");

    // Reads miss and writes are dropped without raising.
    assert!(cache.get_cached_state(FORK_A, "u1").await.is_none());
    assert!(cache.set_cached_state(FORK_A, "u1", 2u64).await.is_ok());
    assert!(
        cache
            .append_cached_array(FORK_A, ["u1", "events"], &numbers(&[1]))
            .await
            .is_ok()
    );
    assert!(
        cache
            .set_cached_array(FORK_A, ["u1", "events"], &numbers(&[1]))
            .await
            .is_ok()
    );
    assert_eq!(cache.get_cached_array_length(FORK_A, ["u1", "events"]).await, 0);
    assert!(cache.read_cached_array(FORK_A, ["u1", "events"]).await.is_empty());
    assert!(
        cache
            .get_cached_array_range(FORK_A, ["u1", "events"], 0, None)
            .await
            .is_empty()
    );
    assert_eq!(cache.clear_cached_state_for_base_key(FORK_A, "u1").await, 0);
    cache.clear_cached_state(FORK_A).await;
    assert!(cache.list_cache_entries(&EntryFilter::all()).await.is_empty());
    assert!(cache.get_cache_entries_summary().await.is_empty());
}

#[tokio::test]
async fn test_disabled_cache() {
    let cache = StateCache::disabled();
    assert!(!cache.is_enabled());

    assert!(cache.set_cached_state(FORK_A, "u1", 1u64).await.is_ok());
    assert!(cache.get_cached_state(FORK_A, "u1").await.is_none());
    assert!(
        cache
            .append_cached_array(FORK_A, ["u1", "events"], &numbers(&[1]))
            .await
            .is_ok()
    );
    assert_eq!(cache.get_cached_array_length(FORK_A, ["u1", "events"]).await, 0);
    assert!(cache.get_cache_entries_summary().await.is_empty());
    assert!(cache.delete_database().await.is_ok());

    // Invalid input is still rejected.
    assert!(matches!(
        cache.set_cached_state(FORK_A, KeyPath::default(), 1u64).await,
        Err(CacheError::EmptyKeyPath)
    ));
}

#[tokio::test]
async fn test_open_falls_back_to_disabled() {
    let config = CacheConfig {
        store: StoreConfig::Sqlite {
            path: PathBuf::new(),
            busy_timeout_secs: None,
        },
        ..CacheConfig::default()
    };
    let cache = StateCache::open(&config).await;
    assert!(!cache.is_enabled());
}

#[tokio::test]
async fn test_open_in_memory() {
    let cache = StateCache::open(&CacheConfig::in_memory()).await;
    assert!(cache.is_enabled());

    cache
        .set_cached_array(FORK_A, ["u1", "events"], &numbers(&[3, 2, 1]))
        .await
        .unwrap();
    assert_eq!(
        cache.read_cached_array(FORK_A, ["u1", "events"]).await,
        numbers(&[3, 2, 1])
    );
}
