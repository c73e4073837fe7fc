// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_object::{DeleteObjectError, DeleteObjectOutput};
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
use aws_sdk_s3::operation::put_object::{PutObjectError, PutObjectOutput};
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;
use internal_error::{InternalError, ResultIntoInternal};
use thiserror::Error;
use url::Url;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone)]
pub struct S3Context {
    pub client: Client,
    pub endpoint: Option<String>,
    pub bucket: String,
    pub key_prefix: String,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl S3Context {
    const MAX_LISTED_OBJECTS: i32 = 1000;

    pub fn new<S1, S2, S3>(client: Client, endpoint: Option<S1>, bucket: S2, key_prefix: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            client,
            endpoint: endpoint.map(Into::into),
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
        }
    }

    #[tracing::instrument(level = "info", name = "init_s3_context")]
    pub async fn from_items(endpoint: Option<String>, bucket: String, key_prefix: String) -> Self {
        // Note: Falling back to `unspecified` region as SDK errors out when the region
        // not set even if using custom endpoint
        let region_provider = aws_config::meta::region::RegionProviderChain::default_provider()
            .or_else("unspecified");
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        let s3_config = if let Some(endpoint) = endpoint.clone() {
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint)
                .force_path_style(true)
                .build()
        } else {
            aws_sdk_s3::config::Builder::from(&sdk_config).build()
        };

        let client = Client::from_conf(s3_config);

        Self::new(client, endpoint, bucket, key_prefix)
    }

    pub async fn from_url(url: &Url) -> Result<Self, UnsupportedS3UrlError> {
        let (endpoint, bucket, mut key_prefix) = Self::split_url(url)?;

        if !key_prefix.is_empty() && !key_prefix.ends_with('/') {
            key_prefix.push('/');
        }

        Ok(Self::from_items(endpoint, bucket, key_prefix).await)
    }

    /// Splits `s3://bucket/prefix`, `s3+http://host:port/bucket/prefix` and
    /// `s3+https://host/bucket/prefix` into endpoint, bucket and key prefix
    pub fn split_url(url: &Url) -> Result<(Option<String>, String, String), UnsupportedS3UrlError> {
        // TODO: Support virtual hosted style URLs
        let (endpoint, path): (Option<String>, String) =
            match (url.scheme(), url.host_str(), url.port(), url.path()) {
                ("s3", Some(host), None, path) => {
                    return Ok((
                        None,
                        host.to_owned(),
                        path.trim_start_matches('/').to_owned(),
                    ));
                }
                ("s3+http", Some(host), None, path) => {
                    (Some(format!("http://{host}")), path.to_owned())
                }
                ("s3+http", Some(host), Some(port), path) => {
                    (Some(format!("http://{host}:{port}")), path.to_owned())
                }
                ("s3+https", Some(host), None, path) => {
                    (Some(format!("https://{host}")), path.to_owned())
                }
                ("s3+https", Some(host), Some(port), path) => {
                    (Some(format!("https://{host}:{port}")), path.to_owned())
                }
                _ => {
                    return Err(UnsupportedS3UrlError {
                        url: url.to_string(),
                    });
                }
            };

        let (bucket, key_prefix) = match path.trim_start_matches('/').split_once('/') {
            Some((b, p)) => (b.to_owned(), p.to_owned()),
            None => (path.trim_start_matches('/').to_owned(), String::new()),
        };

        Ok((endpoint, bucket, key_prefix))
    }

    pub fn get_key(&self, sub_key: &str) -> String {
        if self.key_prefix.is_empty() {
            String::from(sub_key)
        } else {
            format!("{}{}", self.key_prefix, sub_key)
        }
    }

    /// Inverse of [`S3Context::get_key`]
    pub fn strip_key_prefix<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.key_prefix.as_str())
    }

    pub async fn head_object(
        &self,
        key: String,
    ) -> Result<HeadObjectOutput, SdkError<HeadObjectError>> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
    }

    pub async fn get_object(
        &self,
        key: String,
    ) -> Result<GetObjectOutput, SdkError<GetObjectError>> {
        self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
    }

    pub async fn put_object(
        &self,
        key: String,
        data: Bytes,
    ) -> Result<PutObjectOutput, SdkError<PutObjectError>> {
        let size = i64::try_from(data.len()).unwrap_or(i64::MAX);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(data.into())
            .content_length(size)
            .send()
            .await
    }

    pub async fn delete_object(
        &self,
        key: String,
    ) -> Result<DeleteObjectOutput, SdkError<DeleteObjectError>> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
    }

    /// Lists full object keys under the prefix, following continuation tokens
    pub async fn list_keys(&self, key_prefix: &str) -> Result<Vec<String>, InternalError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let list_response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(key_prefix)
                .max_keys(Self::MAX_LISTED_OBJECTS)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .int_err()?;

            keys.extend(
                list_response
                    .contents
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|obj| obj.key),
            );

            if list_response.is_truncated.unwrap_or_default() {
                continuation_token = list_response.next_continuation_token;
            }
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(keys)
    }

    pub async fn recursive_delete(&self, key_prefix: String) -> Result<(), InternalError> {
        // ListObjectsV2Request returns at most S3Context::MAX_LISTED_OBJECTS=1000 items
        let mut has_next_page = true;
        while has_next_page {
            let list_response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&key_prefix)
                .max_keys(Self::MAX_LISTED_OBJECTS)
                .send()
                .await
                .int_err()?;

            if let Some(contents) = list_response.contents {
                let object_identifiers = contents
                    .into_iter()
                    .filter_map(|obj| obj.key)
                    .map(|key| ObjectIdentifier::builder().key(key).build())
                    .collect::<Result<Vec<_>, _>>()
                    .int_err()?;

                has_next_page = list_response.is_truncated.unwrap_or_default();
                self.client
                    .delete_objects()
                    .bucket(&self.bucket)
                    .delete(
                        Delete::builder()
                            .set_objects(Some(object_identifiers))
                            .quiet(true)
                            .build()
                            .int_err()?,
                    )
                    .send()
                    .await
                    .int_err()?;
            } else {
                has_next_page = false;
            }
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported S3 url format: {url}")]
pub struct UnsupportedS3UrlError {
    pub url: String,
}
