// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::Path;
use std::time::Duration;

use duration_string::DurationString;
use internal_error::{InternalError, ResultIntoInternal};
use serde::{Deserialize, Serialize};
use tensorvault_storage::DEFAULT_MEMORY_CACHE_SIZE;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 32 * 1024 * 1024;
pub const DEFAULT_DELETE_SAFETY_SIZE: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_LOCK_UPDATE_INTERVAL: Duration = Duration::from_secs(120);
pub const DEFAULT_LOCK_VALIDITY: Duration = Duration::from_secs(300);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Tunables of an opened dataset.
///
/// Can be loaded from a YAML file where every field is optional:
///
/// ```yaml
/// memoryCacheSize: 268435456
/// maxChunkSize: 33554432
/// deleteSafetySize: 1073741824
/// lock:
///   enabled: true
///   updateInterval: 2m
///   validity: 5m
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DatasetConfig {
    /// Capacity of the memory tier of the cache in bytes
    pub memory_cache_size: usize,
    /// Maximum size of a chunk in bytes for newly created tensors
    pub max_chunk_size: u64,
    /// Datasets with approximate size above this value are only deleted
    /// when explicitly allowed
    pub delete_safety_size: u64,
    pub lock: LockConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: DEFAULT_MEMORY_CACHE_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            delete_safety_size: DEFAULT_DELETE_SAFETY_SIZE,
            lock: LockConfig::default(),
        }
    }
}

impl DatasetConfig {
    pub fn load(path: &Path) -> Result<Self, InternalError> {
        tracing::debug!(?path, "Loading dataset config");

        let yaml = std::fs::read_to_string(path).int_err()?;
        Self::from_yaml_str(&yaml)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, InternalError> {
        serde_yaml::from_str(yaml).int_err()
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: u64) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn with_memory_cache_size(mut self, memory_cache_size: usize) -> Self {
        self.memory_cache_size = memory_cache_size;
        self
    }

    pub fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LockConfig {
    /// Whether writers of remote datasets take the dataset lock
    pub enabled: bool,
    /// How often the lock holder refreshes its marker
    pub update_interval: DurationString,
    /// Age after which a marker of another holder is considered abandoned
    pub validity: DurationString,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval: DurationString::new(DEFAULT_LOCK_UPDATE_INTERVAL),
            validity: DurationString::new(DEFAULT_LOCK_VALIDITY),
        }
    }
}

impl LockConfig {
    pub fn new(update_interval: Duration, validity: Duration) -> Self {
        Self {
            enabled: true,
            update_interval: DurationString::new(update_interval),
            validity: DurationString::new(validity),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval.into()
    }

    pub fn validity(&self) -> Duration {
        self.validity.into()
    }
}
