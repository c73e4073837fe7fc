// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use tensorvault::keys::DATASET_LOCK_KEY;
use tensorvault::storage::StorageProvider;
use tensorvault::*;
use time_source::{SystemTimeSource, SystemTimeSourceStub};

use super::helpers::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const UPDATE_INTERVAL: Duration = Duration::from_secs(10);
const VALIDITY: Duration = Duration::from_secs(30);

fn lock_options() -> LockOptions {
    LockOptions {
        update_interval: UPDATE_INTERVAL,
        validity: VALIDITY,
    }
}

fn lock_config() -> LockConfig {
    LockConfig::new(UPDATE_INTERVAL, VALIDITY)
}

fn time_source() -> Arc<SystemTimeSourceStub> {
    Arc::new(SystemTimeSourceStub::new_set(
        Utc.with_ymd_and_hms(2050, 1, 1, 12, 0, 0).unwrap(),
    ))
}

fn noop() -> LockLostCallback {
    Box::new(|| {})
}

fn counting(counter: &Arc<AtomicUsize>) -> LockLostCallback {
    let counter = counter.clone();
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

async fn read_marker(storage: &dyn StorageProvider) -> Option<LockMarker> {
    match storage.get(DATASET_LOCK_KEY).await {
        Ok(data) => Some(serde_json::from_slice(&data).unwrap()),
        Err(_) => None,
    }
}

async fn steal_lock(
    storage: &dyn StorageProvider,
    identity: &str,
    time_source: &dyn SystemTimeSource,
) {
    let marker = LockMarker {
        identity: identity.to_string(),
        timestamp: time_source.now(),
    };
    storage
        .set(
            DATASET_LOCK_KEY,
            Bytes::from(serde_json::to_vec(&marker).unwrap()),
        )
        .await
        .unwrap();
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test(start_paused = true))]
async fn test_acquire_writes_and_refreshes_marker() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();

    let handle = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();

    assert_eq!(handle.identity(), "a");
    assert!(!handle.is_lost());

    let marker = read_marker(inner.as_ref()).await.unwrap();
    assert_eq!(marker.identity, "a");
    assert_eq!(marker.timestamp, time_source.now());

    let writes_after_acquire = remote.num_writes();
    time_source.advance(chrono::Duration::seconds(5));
    tokio::time::sleep(UPDATE_INTERVAL * 3 + Duration::from_secs(1)).await;

    assert!(remote.num_writes() >= writes_after_acquire + 3);
    assert!(!handle.is_lost());

    let marker = read_marker(inner.as_ref()).await.unwrap();
    assert_eq!(marker.identity, "a");
    assert_eq!(marker.timestamp, time_source.now());

    handle.release().await;
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_second_identity_is_rejected() {
    let (_inner, remote) = new_remote_storage();
    let time_source = time_source();

    let handle = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();

    let res = DatasetLock::acquire(
        remote.clone(),
        "b".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await;

    assert_matches!(
        res,
        Err(AcquireLockError::Locked(LockedError { holder, .. })) if holder == "a"
    );

    handle.release().await;

    let handle = DatasetLock::acquire(
        remote.clone(),
        "b".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();
    assert_eq!(handle.identity(), "b");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_same_identity_reacquires() {
    let (_inner, remote) = new_remote_storage();
    let time_source = time_source();

    let first = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();
    drop(first);

    let second = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();

    second.release().await;
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_expired_marker_is_taken_over() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();

    steal_lock(inner.as_ref(), "stale", time_source.as_ref()).await;
    time_source.advance(chrono::Duration::seconds(31));

    let handle = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();

    assert_eq!(read_marker(inner.as_ref()).await.unwrap().identity, "a");

    handle.release().await;
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loss_is_detected_once() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();
    let counter = Arc::new(AtomicUsize::new(0));

    let handle = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        counting(&counter),
    )
    .await
    .unwrap();

    steal_lock(inner.as_ref(), "b", time_source.as_ref()).await;
    tokio::time::sleep(UPDATE_INTERVAL * 5).await;

    assert!(handle.is_lost());
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // The new holder's marker is left untouched
    handle.release().await;
    assert_eq!(read_marker(inner.as_ref()).await.unwrap().identity, "b");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_loss_when_marker_disappears() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();
    let counter = Arc::new(AtomicUsize::new(0));

    let handle = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        counting(&counter),
    )
    .await
    .unwrap();

    inner.delete(DATASET_LOCK_KEY).await.unwrap();
    tokio::time::sleep(UPDATE_INTERVAL * 2).await;

    assert!(handle.is_lost());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_release_removes_own_marker() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();

    let handle = DatasetLock::acquire(
        remote.clone(),
        "a".to_string(),
        lock_options(),
        time_source.clone(),
        noop(),
    )
    .await
    .unwrap();

    assert!(inner.contains(DATASET_LOCK_KEY).await.unwrap());
    handle.release().await;
    assert!(!inner.contains(DATASET_LOCK_KEY).await.unwrap());
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test(start_paused = true))]
async fn test_dataset_open_takes_lock() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();

    let writer = Dataset::open(
        remote.clone(),
        DatasetOpenOptions::default()
            .with_config(DatasetConfig::default().with_lock(lock_config()))
            .with_lock_identity("a")
            .with_time_source(time_source.clone()),
    )
    .await
    .unwrap();

    assert!(writer.holds_lock());
    assert!(!writer.read_only());
    assert_eq!(read_marker(inner.as_ref()).await.unwrap().identity, "a");

    let other = Dataset::open(
        remote.clone(),
        DatasetOpenOptions::default()
            .with_config(DatasetConfig::default().with_lock(lock_config()))
            .with_lock_identity("b")
            .with_time_source(time_source.clone()),
    )
    .await
    .unwrap();

    assert!(!other.holds_lock());
    assert!(other.read_only());
    assert_matches!(
        other.create_tensor("t", TensorOptions::default()).await,
        Err(CreateTensorError::ReadOnly(_))
    );

    writer.create_tensor("t", TensorOptions::default()).await.unwrap();
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_dataset_becomes_read_only_after_loss() {
    let (inner, remote) = new_remote_storage();
    let time_source = time_source();

    let ds = Dataset::open(
        remote.clone(),
        DatasetOpenOptions::default()
            .with_config(DatasetConfig::default().with_lock(lock_config()))
            .with_lock_identity("a")
            .with_time_source(time_source.clone()),
    )
    .await
    .unwrap();

    let t = ds.create_tensor("t", TensorOptions::default()).await.unwrap();
    t.append(sample("before")).await.unwrap();

    steal_lock(inner.as_ref(), "b", time_source.as_ref()).await;
    tokio::time::sleep(UPDATE_INTERVAL * 2).await;

    assert!(ds.lock_lost());
    assert!(ds.read_only());
    assert_matches!(
        t.append(sample("after")).await,
        Err(TensorWriteError::ReadOnly(_))
    );

    // Reads keep working
    assert_eq!(read_all(&t).await, samples(&["before"]));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_read_only_open_does_not_lock() {
    let (inner, remote) = new_remote_storage();

    Dataset::open(
        remote.clone(),
        DatasetOpenOptions::default()
            .with_config(DatasetConfig::default().with_lock(LockConfig::disabled())),
    )
    .await
    .unwrap();
    assert!(!inner.contains(DATASET_LOCK_KEY).await.unwrap());

    let ds = Dataset::open(remote.clone(), DatasetOpenOptions::read_only())
        .await
        .unwrap();

    assert!(!ds.holds_lock());
    assert!(!inner.contains(DATASET_LOCK_KEY).await.unwrap());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_disabled_lock_is_skipped() {
    let (inner, remote) = new_remote_storage();

    let ds = Dataset::open(
        remote.clone(),
        DatasetOpenOptions::default()
            .with_config(DatasetConfig::default().with_lock(LockConfig::disabled())),
    )
    .await
    .unwrap();

    assert!(!ds.holds_lock());
    assert!(!ds.read_only());
    assert!(!inner.contains(DATASET_LOCK_KEY).await.unwrap());
}

#[test_log::test(tokio::test)]
async fn test_memory_dataset_is_not_locked() {
    let ds = new_mem_dataset().await;
    assert!(!ds.holds_lock());
    assert!(!ds.lock_lost());
}
