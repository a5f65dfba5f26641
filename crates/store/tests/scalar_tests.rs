//! Integration tests for scalar cache entries.

mod common;

use chaincache_core::{KeyPath, StateValue, U256};
use chaincache_store::repos::ScalarRepo;
use chaincache_store::{CacheError, SqliteStore};
use common::TestCache;
use common::fixtures::{FORK_A, FORK_B, event};

fn big_debt() -> U256 {
    U256::from_dec_str("123456789012345678901234567890").unwrap()
}

#[tokio::test]
async fn test_scalar_round_trip_with_nested_wide_integers() {
    let cache = TestCache::in_memory()
        .await
        .expect("Failed to create cache");
    let store = cache.store();

    let position = StateValue::from_iter([
        ("collateral", StateValue::Wide(U256::MAX)),
        (
            "debts",
            StateValue::from(vec![
                StateValue::from_iter([
                    ("asset", StateValue::from("usdc")),
                    ("amount", StateValue::Wide(big_debt())),
                ]),
                event(7),
            ]),
        ),
    ]);

    let key = KeyPath::from(["0xabc", "position"]);
    store
        .set_scalar(FORK_A, &key, &position)
        .await
        .expect("set failed");

    let cached = store
        .get_scalar(FORK_A, &key)
        .await
        .expect("get failed")
        .expect("scalar not found");
    assert_eq!(cached, position);

    let debts = cached.get("debts").and_then(StateValue::as_list).unwrap();
    assert_eq!(
        debts[0].get("amount").and_then(StateValue::as_wide),
        Some(big_debt())
    );
}

#[tokio::test]
async fn test_set_overwrites_in_place() {
    let cache = TestCache::in_memory().await.unwrap();
    let store = cache.store();
    let key = KeyPath::from(["0xabc", "balance"]);

    store
        .set_scalar(FORK_A, &key, &StateValue::from(1u64))
        .await
        .unwrap();
    store
        .set_scalar(FORK_A, &key, &StateValue::from(2u64))
        .await
        .unwrap();

    assert_eq!(
        store.get_scalar(FORK_A, &key).await.unwrap(),
        Some(StateValue::from(2u64))
    );
    assert_eq!(cache.count_rows(FORK_A, "0xabc", r#"["balance"]"#).await, 1);
}

#[tokio::test]
async fn test_missing_scalar_is_none() {
    let cache = TestCache::in_memory().await.unwrap();
    let store = cache.store();

    let missing = store
        .get_scalar(FORK_A, &KeyPath::from(["0xabc", "nothing"]))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_bare_string_and_single_segment_share_entry() {
    let cache = TestCache::in_memory().await.unwrap();
    let store = cache.store();

    store
        .set_scalar(FORK_A, &KeyPath::from("0xabc"), &StateValue::from("hello"))
        .await
        .unwrap();

    let via_list = store
        .get_scalar(FORK_A, &KeyPath::from(vec!["0xabc".to_string()]))
        .await
        .unwrap();
    assert_eq!(via_list, Some(StateValue::from("hello")));
}

#[tokio::test]
async fn test_empty_key_path() {
    let cache = TestCache::in_memory().await.unwrap();
    let store = cache.store();
    let empty = KeyPath::default();

    // Reads treat an empty path as a miss.
    assert!(store.get_scalar(FORK_A, &empty).await.unwrap().is_none());

    // Writes reject it.
    let err = store
        .set_scalar(FORK_A, &empty, &StateValue::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::EmptyKeyPath));
}

#[tokio::test]
async fn test_protocols_are_isolated() {
    let cache = TestCache::in_memory().await.unwrap();
    let store = cache.store();
    let key = KeyPath::from(["0xabc", "balance"]);

    store
        .set_scalar(FORK_A, &key, &StateValue::from(10u64))
        .await
        .unwrap();

    assert!(store.get_scalar(FORK_B, &key).await.unwrap().is_none());

    store
        .set_scalar(FORK_B, &key, &StateValue::from(20u64))
        .await
        .unwrap();
    assert_eq!(
        store.get_scalar(FORK_A, &key).await.unwrap(),
        Some(StateValue::from(10u64))
    );
}

#[tokio::test]
async fn test_scalar_survives_reopen() {
    let cache = TestCache::new().await.unwrap();
    let db_path = cache.db_path().unwrap().to_path_buf();
    let key = KeyPath::from(["0xabc", "debt"]);

    cache
        .store()
        .set_scalar(FORK_A, &key, &StateValue::Wide(U256::from(42u64)))
        .await
        .unwrap();
    cache.pool().close().await;

    let reopened = SqliteStore::new(&db_path, None)
        .await
        .expect("reopen failed");
    assert_eq!(
        reopened.get_scalar(FORK_A, &key).await.unwrap(),
        Some(StateValue::Wide(U256::from(42u64)))
    );
}
