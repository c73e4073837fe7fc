// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_MEMORY_CACHE_SIZE: usize = 256 * 1024 * 1024;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Write-back caching layer over a base [`StorageProvider`].
///
/// Keeps recently used objects in a memory tier bounded by total size in
/// bytes and evicted in least-recently-used order. With autoflush enabled
/// every write goes straight through to the base tier, otherwise writes are
/// kept as dirty entries until [`CacheStorage::flush`] is called.
///
/// A dirty entry is always written to the base tier before it leaves the
/// memory tier, whether by flush or by eviction.
pub struct CacheStorage {
    base: Arc<dyn StorageProvider>,
    state: Mutex<CacheState>,
    autoflush: AtomicBool,
    read_only: ReadOnlySwitch,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl CacheStorage {
    pub fn new(base: Arc<dyn StorageProvider>, capacity: usize) -> Self {
        Self {
            base,
            state: Mutex::new(CacheState::new(capacity)),
            autoflush: AtomicBool::new(true),
            read_only: ReadOnlySwitch::default(),
        }
    }

    pub fn with_default_capacity(base: Arc<dyn StorageProvider>) -> Self {
        Self::new(base, DEFAULT_MEMORY_CACHE_SIZE)
    }

    pub fn base(&self) -> &Arc<dyn StorageProvider> {
        &self.base
    }

    pub fn autoflush(&self) -> bool {
        self.autoflush.load(Ordering::SeqCst)
    }

    /// Returns the previous value
    pub fn set_autoflush(&self, autoflush: bool) -> bool {
        self.autoflush.swap(autoflush, Ordering::SeqCst)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.is_enabled()
    }

    pub fn enable_readonly(&self) {
        self.read_only.enable();
    }

    pub fn disable_readonly(&self) {
        self.read_only.disable();
    }

    /// Shared handle to the read-only flag that can be flipped from other
    /// tasks without going through the cache
    pub fn read_only_switch(&self) -> ReadOnlySwitch {
        self.read_only.clone()
    }

    pub fn check_read_only(&self) -> Result<(), ReadOnlyError> {
        if self.read_only.is_enabled() {
            Err(ReadOnlyError)
        } else {
            Ok(())
        }
    }

    pub async fn dirty_keys(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Total size of the objects currently held in the memory tier
    pub async fn cached_size(&self) -> usize {
        self.state.lock().await.size
    }

    pub async fn is_cached(&self, key: &str) -> bool {
        self.state.lock().await.entries.contains(key)
    }

    /// Writes all dirty entries to the base tier
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn flush(&self) -> Result<(), SetError> {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await
    }

    /// Flushes only if autoflush is enabled
    pub async fn maybe_flush(&self) -> Result<(), SetError> {
        if self.autoflush() {
            self.flush().await
        } else {
            Ok(())
        }
    }

    /// Flushes and then drops everything from the memory tier
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn clear_cache(&self) -> Result<(), SetError> {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await?;
        state.entries.clear();
        state.size = 0;
        Ok(())
    }

    async fn flush_locked(&self, state: &mut CacheState) -> Result<(), SetError> {
        let dirty: Vec<(String, Bytes)> = state
            .entries
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(k, e)| (k.clone(), e.data.clone()))
            .collect();

        if dirty.is_empty() {
            return Ok(());
        }

        self.check_read_only()?;

        tracing::debug!(num_dirty = dirty.len(), "Flushing dirty keys");

        for (key, data) in dirty {
            self.base.set(&key, data).await?;
            if let Some(entry) = state.entries.peek_mut(&key) {
                entry.dirty = false;
            }
        }

        Ok(())
    }

    /// Writes evicted dirty entries to the base tier. On failure the entry
    /// and everything after it go back into the memory tier as dirty.
    async fn write_back(
        &self,
        state: &mut CacheState,
        evicted: Vec<(String, Bytes)>,
    ) -> Result<(), SetError> {
        let mut evicted = evicted.into_iter();

        while let Some((key, data)) = evicted.next() {
            tracing::debug!(%key, "Writing back evicted object");

            if let Err(err) = self.base.set(&key, data.clone()).await {
                state.restore(key, data);
                for (key, data) in evicted {
                    state.restore(key, data);
                }
                return Err(err);
            }
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl StorageProvider for CacheStorage {
    fn protocol(&self) -> StorageProtocol {
        self.base.protocol()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn contains(&self, key: &str) -> Result<bool, ContainsError> {
        {
            let state = self.state.lock().await;
            if state.entries.contains(key) {
                return Ok(true);
            }
        }
        self.base.contains(key).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn get(&self, key: &str) -> Result<Bytes, GetError> {
        let mut state = self.state.lock().await;

        if let Some(entry) = state.entries.get(key) {
            return Ok(entry.data.clone());
        }

        tracing::debug!("Cache miss, reading from base");

        let data = self.base.get(key).await?;
        let evicted = state.insert(key.to_owned(), data.clone(), false);
        self.write_back(&mut state, evicted).await?;

        Ok(data)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key, size = data.len()))]
    async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError> {
        self.check_read_only()?;

        let mut state = self.state.lock().await;

        let evicted = if self.autoflush() {
            self.base.set(key, data.clone()).await?;
            state.insert(key.to_owned(), data, false)
        } else {
            state.insert(key.to_owned(), data, true)
        };

        self.write_back(&mut state, evicted).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn delete(&self, key: &str) -> Result<(), DeleteError> {
        self.check_read_only()?;

        let mut state = self.state.lock().await;
        state.remove(key);
        self.base.delete(key).await
    }

    async fn list_keys(&self) -> Result<Vec<String>, ListError> {
        let state = self.state.lock().await;

        let mut keys: BTreeSet<String> = self.base.list_keys().await?.into_iter().collect();
        keys.extend(
            state
                .entries
                .iter()
                .filter(|(_, e)| e.dirty)
                .map(|(k, _)| k.clone()),
        );

        Ok(keys.into_iter().collect())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn clear(&self) -> Result<(), DeleteError> {
        self.check_read_only()?;

        let mut state = self.state.lock().await;
        state.entries.clear();
        state.size = 0;

        self.base.clear().await
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Shared read-only flag of a [`CacheStorage`]
#[derive(Debug, Clone, Default)]
pub struct ReadOnlySwitch(Arc<AtomicBool>);

impl ReadOnlySwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct CacheEntry {
    data: Bytes,
    dirty: bool,
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    size: usize,
    capacity: usize,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            size: 0,
            capacity,
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.pop(key) {
            self.size -= old.data.len();
        }
    }

    /// Inserts an entry and evicts least recently used ones until the tier
    /// fits its capacity. Returns evicted dirty entries that still need to be
    /// written to the base tier.
    fn insert(&mut self, key: String, data: Bytes, dirty: bool) -> Vec<(String, Bytes)> {
        self.remove(&key);

        if data.len() > self.capacity {
            return if dirty { vec![(key, data)] } else { Vec::new() };
        }

        self.size += data.len();
        self.entries.put(key, CacheEntry { data, dirty });

        let mut evicted = Vec::new();
        while self.size > self.capacity {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.size -= entry.data.len();
            if entry.dirty {
                evicted.push((key, entry.data));
            }
        }
        evicted
    }

    /// Puts a dirty entry back without evicting anything
    fn restore(&mut self, key: String, data: Bytes) {
        self.remove(&key);
        self.size += data.len();
        self.entries.put(key, CacheEntry { data, dirty: true });
    }
}
