// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;
use std::sync::Arc;

use internal_error::{InternalError, ResultIntoInternal};
use serde::{Deserialize, Serialize};
use tensorvault_storage::StorageProvider;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Everything needed to re-open an equivalent view of a dataset in another
/// process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetState {
    pub path: String,
    pub read_only: bool,
    pub index: Index,
    pub group_index: String,
    pub version_state: VersionStateSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionStateSnapshot {
    pub commit_id: String,
    pub branch: String,
    pub commit_node_map: BTreeMap<String, CommitNode>,
    pub branch_commit_map: BTreeMap<String, String>,
}

impl DatasetState {
    pub fn to_json(&self) -> Result<String, InternalError> {
        serde_json::to_string(self).int_err()
    }

    pub fn from_json(json: &str) -> Result<Self, InternalError> {
        serde_json::from_str(json).int_err()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl Dataset {
    /// Captures the view for re-opening elsewhere. In-memory datasets are
    /// local to the process and can not be captured.
    pub async fn to_state(&self) -> Result<DatasetState, MemoryDatasetCanNotBeSerializedError> {
        let core = self.core();

        if core.storage.protocol().is_memory() {
            return Err(MemoryDatasetCanNotBeSerializedError {
                path: core.path.clone(),
            });
        }

        let vs = core.version_state.lock().await;
        Ok(DatasetState {
            path: core.path.clone(),
            read_only: core.is_read_only(),
            index: self.index().clone(),
            group_index: self.group_index().to_string(),
            version_state: VersionStateSnapshot {
                commit_id: vs.commit_id.clone(),
                branch: vs.branch.clone(),
                commit_node_map: vs.info.commit_node_map.clone(),
                branch_commit_map: vs.info.branch_commit_map.clone(),
            },
        })
    }

    /// Re-opens a captured view over `storage`, which must point to the
    /// captured path. The view is positioned at the captured commit.
    pub async fn restore(
        state: DatasetState,
        storage: Arc<dyn StorageProvider>,
        options: DatasetOpenOptions,
    ) -> Result<Self, OpenDatasetError> {
        let DatasetState {
            read_only,
            index,
            group_index,
            version_state,
            ..
        } = state;

        // Only trivial root views take the lock
        let read_only = read_only || options.read_only;
        let mut options = options.with_read_only(read_only);
        if !index.is_trivial() || !group_index.is_empty() {
            options.config.lock.enabled = false;
        }

        let position = VersionState::new(
            VersionInfo {
                commit_node_map: version_state.commit_node_map,
                branch_commit_map: version_state.branch_commit_map,
            },
            version_state.branch,
            version_state.commit_id,
        );

        let core = open_core(storage, options, Some(position)).await?;
        Ok(Self::new(core, index, group_index))
    }

    /// Same as [`Dataset::restore`] picking the storage provider by the
    /// captured path
    pub async fn restore_path(
        state: DatasetState,
        options: DatasetOpenOptions,
    ) -> Result<Self, OpenDatasetError> {
        let storage = storage_provider_from_path(&state.path).await?;
        Self::restore(state, storage, options).await
    }
}
