// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use bytes::Bytes;
use tensorvault::storage::StorageProvider;
use tensorvault::storage::testing::StorageProviderRemoteStub;
use tensorvault::*;
use tensorvault_storage_inmem::StorageProviderInMemory;
use url::Url;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub fn sample(s: &str) -> Bytes {
    Bytes::from(s.to_string())
}

pub fn samples(values: &[&str]) -> Vec<Bytes> {
    values.iter().map(|s| sample(s)).collect()
}

pub async fn new_mem_dataset() -> Dataset {
    Dataset::open(
        Arc::new(StorageProviderInMemory::new("test")),
        DatasetOpenOptions::default(),
    )
    .await
    .unwrap()
}

pub async fn open_dataset(storage: Arc<dyn StorageProvider>) -> Dataset {
    Dataset::open(storage, DatasetOpenOptions::default())
        .await
        .unwrap()
}

pub fn new_remote_storage() -> (Arc<StorageProviderInMemory>, Arc<StorageProviderRemoteStub>) {
    let inner = Arc::new(StorageProviderInMemory::new("remote"));
    let remote = Arc::new(StorageProviderRemoteStub::new(
        inner.clone(),
        Url::parse("s3://bucket/datasets/test").unwrap(),
    ));
    (inner, remote)
}

pub async fn read_all(tensor: &Tensor) -> Vec<Bytes> {
    tensor.read().await.unwrap().into_vec()
}
