// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use internal_error::{InternalError, ResultIntoInternal};
use tensorvault_storage::{StorageProtocol, StorageProvider};
use tensorvault_storage_inmem::StorageProviderInMemory;
use tensorvault_storage_lfs::StorageProviderLocalFs;
use tensorvault_storage_s3::StorageProviderS3;
use url::Url;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const S3_SCHEMES: &[&str] = &["s3://", "s3+http://", "s3+https://"];

/// Picks a storage provider for a dataset path: `mem://<name>` is kept in
/// process memory, `s3://bucket/prefix` goes to S3 and anything else is a
/// local directory
#[tracing::instrument(level = "debug")]
pub async fn storage_provider_from_path(
    path: &str,
) -> Result<Arc<dyn StorageProvider>, InternalError> {
    if let Some(name) = path.strip_prefix(StorageProtocol::MEMORY_SCHEME) {
        return Ok(Arc::new(StorageProviderInMemory::new(name)));
    }

    if S3_SCHEMES.iter().any(|scheme| path.starts_with(scheme)) {
        let url = Url::parse(path).int_err()?;
        let provider = StorageProviderS3::from_url(&url).await.int_err()?;
        return Ok(Arc::new(provider));
    }

    Ok(Arc::new(StorageProviderLocalFs::new(path)))
}
