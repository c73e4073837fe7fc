// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use internal_error::{ErrorIntoInternal, ResultIntoInternal};
use tensorvault_storage::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Stores every key as a file under the root directory, `/` in keys mapping
/// to sub-directories
pub struct StorageProviderLocalFs {
    root: PathBuf,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl StorageProviderLocalFs {
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn get_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key.split('/').filter(|s| !s.is_empty()));
        path
    }

    // TODO: Cleanup procedure for orphaned staging files?
    fn get_staging_path(&self) -> Result<PathBuf, std::io::Error> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
        }

        Ok(self.root.join(get_staging_name()))
    }

    fn key_from_relative_path(path: &std::path::Path) -> Option<String> {
        let mut segments = Vec::new();
        for component in path.components() {
            segments.push(component.as_os_str().to_str()?);
        }
        Some(segments.join("/"))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl StorageProvider for StorageProviderLocalFs {
    fn protocol(&self) -> StorageProtocol {
        StorageProtocol::LocalFs {
            base_dir: self.root.clone(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn contains(&self, key: &str) -> Result<bool, ContainsError> {
        let path = self.get_path(key);

        tracing::debug!(?path, "Checking for object");

        Ok(path.is_file())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn get(&self, key: &str) -> Result<Bytes, GetError> {
        let path = self.get_path(key);

        tracing::debug!(?path, "Reading object");

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(GetError::NotFound(KeyNotFoundError::new(key)))
            }
            Err(err) => Err(err.int_err().into()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError> {
        let path = self.get_path(key);

        tracing::debug!(?path, "Writing object");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.int_err()?;
        }

        let staging_path = self.get_staging_path().int_err()?;

        // Write to staging file
        tokio::fs::write(&staging_path, &data).await.int_err()?;

        // Atomic move
        tokio::fs::rename(&staging_path, &path).await.int_err()?;

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    async fn delete(&self, key: &str) -> Result<(), DeleteError> {
        let path = self.get_path(key);

        tracing::debug!(?path, "Deleting object");

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.int_err().into()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn list_keys(&self) -> Result<Vec<String>, ListError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();

        for entry in walkdir::WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.int_err()?;
            if !entry.file_type().is_file() || is_staging_name(&entry.file_name().to_string_lossy())
            {
                continue;
            }

            let relative_path = entry.path().strip_prefix(&self.root).int_err()?;
            match Self::key_from_relative_path(relative_path) {
                Some(key) => keys.push(key),
                None => {
                    return Err(format!("Non UTF-8 file name: {}", entry.path().display())
                        .int_err()
                        .into());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn clear(&self) -> Result<(), DeleteError> {
        tracing::debug!(root = ?self.root, "Removing all objects");

        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.int_err().into()),
        }
    }
}
