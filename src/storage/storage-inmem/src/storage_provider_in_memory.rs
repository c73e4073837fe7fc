// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tensorvault_storage::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Keeps objects in process memory. Data lives as long as the provider
/// instance, so share it via `Arc` to reopen a dataset over the same objects.
pub struct StorageProviderInMemory {
    name: String,
    objects_by_key: Mutex<BTreeMap<String, Bytes>>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl StorageProviderInMemory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects_by_key: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn num_objects(&self) -> usize {
        self.objects_by_key.lock().unwrap().len()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl StorageProvider for StorageProviderInMemory {
    fn protocol(&self) -> StorageProtocol {
        StorageProtocol::Memory {
            name: self.name.clone(),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool, ContainsError> {
        let objects_by_key = self.objects_by_key.lock().unwrap();
        Ok(objects_by_key.contains_key(key))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn get(&self, key: &str) -> Result<Bytes, GetError> {
        let objects_by_key = self.objects_by_key.lock().unwrap();
        match objects_by_key.get(key) {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(GetError::NotFound(KeyNotFoundError::new(key))),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError> {
        let mut objects_by_key = self.objects_by_key.lock().unwrap();
        objects_by_key.insert(key.to_owned(), data);
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn delete(&self, key: &str) -> Result<(), DeleteError> {
        let mut objects_by_key = self.objects_by_key.lock().unwrap();
        objects_by_key.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, ListError> {
        let objects_by_key = self.objects_by_key.lock().unwrap();
        Ok(objects_by_key.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), DeleteError> {
        let mut objects_by_key = self.objects_by_key.lock().unwrap();
        objects_by_key.clear();
        Ok(())
    }
}
