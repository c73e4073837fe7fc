// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Durable key-value storage that datasets are persisted into.
///
/// Keys are `/`-delimited relative paths. Implementations must treat deleting
/// an absent key as a no-op.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn protocol(&self) -> StorageProtocol;

    async fn contains(&self, key: &str) -> Result<bool, ContainsError>;

    async fn get(&self, key: &str) -> Result<Bytes, GetError>;

    async fn set(&self, key: &str, data: Bytes) -> Result<(), SetError>;

    async fn delete(&self, key: &str) -> Result<(), DeleteError>;

    /// Lists all keys in lexicographic order
    async fn list_keys(&self) -> Result<Vec<String>, ListError>;

    /// Removes every key. Irreversible.
    async fn clear(&self) -> Result<(), DeleteError>;

    async fn is_empty(&self) -> Result<bool, ListError> {
        Ok(self.list_keys().await?.is_empty())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProtocol {
    Memory { name: String },
    LocalFs { base_dir: PathBuf },
    S3 { url: Url },
}

impl StorageProtocol {
    pub const MEMORY_SCHEME: &'static str = "mem://";

    /// Remote locations may be shared between processes and therefore need
    /// a write lock
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::S3 { .. })
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }

    pub fn path(&self) -> String {
        match self {
            Self::Memory { name } => format!("{}{name}", Self::MEMORY_SCHEME),
            Self::LocalFs { base_dir } => base_dir.display().to_string(),
            Self::S3 { url } => url.to_string(),
        }
    }
}

impl std::fmt::Display for StorageProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
