// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use assert_matches::assert_matches;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use tensorvault_storage::*;
use tensorvault_storage_inmem::StorageProviderInMemory;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

mockall::mock! {
    pub Base {}

    #[async_trait::async_trait]
    impl StorageProvider for Base {
        fn protocol(&self) -> StorageProtocol;
        async fn contains(&self, key: &str) -> Result<bool, ContainsError>;
        async fn get(&self, key: &str) -> Result<Bytes, GetError>;
        async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError>;
        async fn delete(&self, key: &str) -> Result<(), DeleteError>;
        async fn list_keys(&self) -> Result<Vec<String>, ListError>;
        async fn clear(&self) -> Result<(), DeleteError>;
        async fn is_empty(&self) -> Result<bool, ListError>;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn data(s: &'static str) -> Bytes {
    Bytes::from_static(s.as_bytes())
}

fn new_cache(capacity: usize) -> (Arc<StorageProviderInMemory>, CacheStorage) {
    let base = Arc::new(StorageProviderInMemory::new("test"));
    let cache = CacheStorage::new(base.clone(), capacity);
    (base, cache)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_autoflush_writes_through() {
    let (base, cache) = new_cache(1024);
    assert!(cache.autoflush());

    cache.set("a", data("foo")).await.unwrap();

    assert_eq!(base.get("a").await.unwrap(), data("foo"));
    assert!(cache.dirty_keys().await.is_empty());
    assert_eq!(cache.get("a").await.unwrap(), data("foo"));
}

#[test_log::test(tokio::test)]
async fn test_flush_durability() {
    let (base, cache) = new_cache(1024 * 1024);
    cache.set_autoflush(false);

    for i in 0..10 {
        cache
            .set(&format!("key_{i}"), Bytes::from(format!("value_{i}")))
            .await
            .unwrap();
    }

    assert!(base.is_empty().await.unwrap());
    assert_eq!(cache.dirty_keys().await.len(), 10);
    assert_eq!(cache.list_keys().await.unwrap().len(), 10);

    cache.flush().await.unwrap();
    assert!(cache.dirty_keys().await.is_empty());

    // Reopen over the base tier alone
    drop(cache);
    let reopened = CacheStorage::new(base.clone(), 1024 * 1024);

    for i in 0..10 {
        assert_eq!(
            reopened.get(&format!("key_{i}")).await.unwrap(),
            Bytes::from(format!("value_{i}"))
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_unflushed_writes_are_not_in_base() {
    let (base, cache) = new_cache(1024);
    cache.set_autoflush(false);

    cache.set("a", data("foo")).await.unwrap();

    assert_matches!(base.get("a").await, Err(GetError::NotFound(_)));
    assert_eq!(cache.get("a").await.unwrap(), data("foo"));
    assert!(cache.contains("a").await.unwrap());
    assert!(!cache.is_empty().await.unwrap());
}

#[test_log::test(tokio::test)]
async fn test_eviction_writes_back_dirty_entries() {
    let (base, cache) = new_cache(10);
    cache.set_autoflush(false);

    cache.set("a", data("aaaaaa")).await.unwrap();
    cache.set("b", data("bbbbbb")).await.unwrap();

    // "a" was least recently used and did not fit
    assert!(!cache.is_cached("a").await);
    assert_eq!(base.get("a").await.unwrap(), data("aaaaaa"));

    assert!(cache.is_cached("b").await);
    assert_matches!(base.get("b").await, Err(GetError::NotFound(_)));
    assert_eq!(cache.dirty_keys().await, vec!["b".to_owned()]);
    assert_eq!(cache.cached_size().await, 6);

    // Evicted data is read back from base
    assert_eq!(cache.get("a").await.unwrap(), data("aaaaaa"));
    assert_eq!(base.get("b").await.unwrap(), data("bbbbbb"));
}

#[test_log::test(tokio::test)]
async fn test_lru_order_respects_reads() {
    let (base, cache) = new_cache(9);

    cache.set("a", data("aaa")).await.unwrap();
    cache.set("b", data("bbb")).await.unwrap();
    cache.set("c", data("ccc")).await.unwrap();

    // Touch "a" so that "b" becomes the eviction candidate
    cache.get("a").await.unwrap();
    cache.set("d", data("ddd")).await.unwrap();

    assert!(cache.is_cached("a").await);
    assert!(!cache.is_cached("b").await);
    assert!(cache.is_cached("c").await);
    assert!(cache.is_cached("d").await);

    // Clean entries are simply dropped
    assert_eq!(base.get("b").await.unwrap(), data("bbb"));
}

#[test_log::test(tokio::test)]
async fn test_oversized_entry_bypasses_memory_tier() {
    let (base, cache) = new_cache(4);
    cache.set_autoflush(false);

    cache.set("small", data("ab")).await.unwrap();
    cache.set("big", data("0123456789")).await.unwrap();

    assert!(!cache.is_cached("big").await);
    assert_eq!(base.get("big").await.unwrap(), data("0123456789"));
    assert!(cache.is_cached("small").await);
}

#[test_log::test(tokio::test)]
async fn test_read_only() {
    let (base, cache) = new_cache(1024);
    cache.set("a", data("foo")).await.unwrap();

    cache.enable_readonly();
    assert!(cache.is_read_only());

    assert_matches!(
        cache.set("b", data("bar")).await,
        Err(SetError::Access(AccessError::ReadOnly(_)))
    );
    assert_matches!(
        cache.delete("a").await,
        Err(DeleteError::Access(AccessError::ReadOnly(_)))
    );
    assert_matches!(
        cache.clear().await,
        Err(DeleteError::Access(AccessError::ReadOnly(_)))
    );

    // Reads and no-op flushes still work
    assert_eq!(cache.get("a").await.unwrap(), data("foo"));
    cache.flush().await.unwrap();

    cache.disable_readonly();
    cache.set("b", data("bar")).await.unwrap();
    assert_eq!(base.get("b").await.unwrap(), data("bar"));
}

#[test_log::test(tokio::test)]
async fn test_read_only_switch_is_shared() {
    let (_base, cache) = new_cache(1024);
    cache.set_autoflush(false);
    cache.set("a", data("foo")).await.unwrap();

    let switch = cache.read_only_switch();
    switch.enable();

    assert!(cache.is_read_only());
    assert_matches!(cache.flush().await, Err(e) if e.is_read_only());

    // Dirty data is kept for a later flush
    assert_eq!(cache.dirty_keys().await, vec!["a".to_owned()]);
}

#[test_log::test(tokio::test)]
async fn test_delete_removes_from_both_tiers() {
    let (base, cache) = new_cache(1024);

    cache.set("a", data("foo")).await.unwrap();
    cache.delete("a").await.unwrap();

    assert_matches!(cache.get("a").await, Err(GetError::NotFound(_)));
    assert_matches!(base.get("a").await, Err(GetError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn test_clear() {
    let (base, cache) = new_cache(1024);
    cache.set("a", data("foo")).await.unwrap();
    cache.set_autoflush(false);
    cache.set("b", data("bar")).await.unwrap();

    cache.clear().await.unwrap();

    assert!(base.is_empty().await.unwrap());
    assert!(cache.is_empty().await.unwrap());
    assert_eq!(cache.cached_size().await, 0);
}

#[test_log::test(tokio::test)]
async fn test_clear_cache_flushes_first() {
    let (base, cache) = new_cache(1024);
    cache.set_autoflush(false);
    cache.set("a", data("foo")).await.unwrap();

    cache.clear_cache().await.unwrap();

    assert_eq!(cache.cached_size().await, 0);
    assert_eq!(base.get("a").await.unwrap(), data("foo"));
    assert_eq!(cache.get("a").await.unwrap(), data("foo"));
}

#[test_log::test(tokio::test)]
async fn test_maybe_flush() {
    let (base, cache) = new_cache(1024);
    cache.set_autoflush(false);
    cache.set("a", data("foo")).await.unwrap();

    cache.maybe_flush().await.unwrap();
    assert!(!base.contains("a").await.unwrap());

    assert!(!cache.set_autoflush(true));
    cache.maybe_flush().await.unwrap();
    assert!(base.contains("a").await.unwrap());
}

#[test_log::test(tokio::test)]
async fn test_no_base_writes_until_flush() {
    let mut base = MockBase::new();
    base.expect_set().times(0);
    let base = Arc::new(base);

    let cache = CacheStorage::new(base, 1024);
    cache.set_autoflush(false);
    cache.set("a", data("foo")).await.unwrap();
    cache.set("a", data("bar")).await.unwrap();
    cache.set("b", data("baz")).await.unwrap();

    assert_eq!(cache.get("a").await.unwrap(), data("bar"));

    let mut base = MockBase::new();
    base.expect_set()
        .withf(|key, data| key == "a" && data.as_ref() == b"bar")
        .times(1)
        .returning(|_, _| Ok(()));
    base.expect_set()
        .withf(|key, data| key == "b" && data.as_ref() == b"baz")
        .times(1)
        .returning(|_, _| Ok(()));

    let cache = CacheStorage::new(Arc::new(base), 1024);
    cache.set_autoflush(false);
    cache.set("a", data("foo")).await.unwrap();
    cache.set("a", data("bar")).await.unwrap();
    cache.set("b", data("baz")).await.unwrap();
    cache.flush().await.unwrap();

    // Nothing left to write
    cache.flush().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_failed_write_back_keeps_data_dirty() {
    let mut base = MockBase::new();
    base.expect_set()
        .returning(|_, _| Err(SetError::Internal(internal_error::InternalError::new("boom"))));

    let cache = CacheStorage::new(Arc::new(base), 4);
    cache.set_autoflush(false);

    cache.set("a", data("aaa")).await.unwrap();
    assert_matches!(cache.set("b", data("bbb")).await, Err(SetError::Internal(_)));

    let mut dirty = cache.dirty_keys().await;
    dirty.sort();
    assert_eq!(dirty, vec!["a".to_owned(), "b".to_owned()]);
    assert_eq!(cache.get("a").await.unwrap(), data("aaa"));
}
