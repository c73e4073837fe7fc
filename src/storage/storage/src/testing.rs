// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use internal_error::InternalError;
use url::Url;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Wraps another provider and presents it as a remote location. Counts writes
/// and can be told to fail them, which lets tests exercise remote-only code
/// paths (locking) and error propagation without a real object store.
pub struct StorageProviderRemoteStub {
    inner: Arc<dyn StorageProvider>,
    url: Url,
    fail_writes: AtomicBool,
    num_writes: AtomicUsize,
}

impl StorageProviderRemoteStub {
    pub fn new(inner: Arc<dyn StorageProvider>, url: Url) -> Self {
        Self {
            inner,
            url,
            fail_writes: AtomicBool::new(false),
            num_writes: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn num_writes(&self) -> usize {
        self.num_writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), InternalError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            InternalError::bail("Simulated write failure")
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageProvider for StorageProviderRemoteStub {
    fn protocol(&self) -> StorageProtocol {
        StorageProtocol::S3 {
            url: self.url.clone(),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool, ContainsError> {
        self.inner.contains(key).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, GetError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError> {
        self.check_writable()?;
        self.num_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, data).await
    }

    async fn delete(&self, key: &str) -> Result<(), DeleteError> {
        self.check_writable()?;
        self.inner.delete(key).await
    }

    async fn list_keys(&self) -> Result<Vec<String>, ListError> {
        self.inner.list_keys().await
    }

    async fn clear(&self) -> Result<(), DeleteError> {
        self.check_writable()?;
        self.inner.clear().await
    }
}
