// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use bytes::Bytes;
use internal_error::{ErrorIntoInternal, ResultIntoInternal};
use tensorvault_storage::*;
use url::Url;

use crate::{S3Context, UnsupportedS3UrlError};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct StorageProviderS3 {
    s3_context: S3Context,
    url: Url,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl StorageProviderS3 {
    pub fn new(s3_context: S3Context, url: Url) -> Self {
        Self { s3_context, url }
    }

    pub async fn from_url(url: &Url) -> Result<Self, UnsupportedS3UrlError> {
        let s3_context = S3Context::from_url(url).await?;
        Ok(Self::new(s3_context, url.clone()))
    }

    pub fn s3_context(&self) -> &S3Context {
        &self.s3_context
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl StorageProvider for StorageProviderS3 {
    fn protocol(&self) -> StorageProtocol {
        StorageProtocol::S3 {
            url: self.url.clone(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn contains(&self, key: &str) -> Result<bool, ContainsError> {
        let key = self.s3_context.get_key(key);

        tracing::debug!(?key, "Checking for object");

        match self.s3_context.head_object(key).await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(false),
            Err(e) => Err(e.int_err().into()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn get(&self, key: &str) -> Result<Bytes, GetError> {
        let full_key = self.s3_context.get_key(key);

        tracing::debug!(key = ?full_key, "Reading object");

        let resp = match self.s3_context.get_object(full_key).await {
            Ok(resp) => resp,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                return Err(GetError::NotFound(KeyNotFoundError::new(key)));
            }
            Err(SdkError::ServiceError(err)) if err.raw().status().as_u16() == 403 => {
                return Err(GetError::Access(AccessError::Forbidden(
                    err.into_err().into(),
                )));
            }
            Err(e) => return Err(e.int_err().into()),
        };

        let data = resp.body.collect().await.int_err()?.into_bytes();
        Ok(data)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key, size = data.len()))]
    async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError> {
        let key = self.s3_context.get_key(key);

        tracing::debug!(?key, "Writing object");

        self.s3_context.put_object(key, data).await.int_err()?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn delete(&self, key: &str) -> Result<(), DeleteError> {
        let key = self.s3_context.get_key(key);

        tracing::debug!(?key, "Deleting object");

        self.s3_context.delete_object(key).await.int_err()?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn list_keys(&self) -> Result<Vec<String>, ListError> {
        let keys = self
            .s3_context
            .list_keys(&self.s3_context.key_prefix)
            .await?;

        let mut keys: Vec<String> = keys
            .iter()
            .filter_map(|k| self.s3_context.strip_key_prefix(k))
            .map(ToOwned::to_owned)
            .collect();
        keys.sort();

        Ok(keys)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn clear(&self) -> Result<(), DeleteError> {
        if self.s3_context.key_prefix.is_empty() {
            return Err("Refusing to clear an entire bucket".int_err().into());
        }

        self.s3_context
            .recursive_delete(self.s3_context.key_prefix.clone())
            .await?;
        Ok(())
    }
}
