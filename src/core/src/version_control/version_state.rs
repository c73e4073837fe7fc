// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use internal_error::InternalError;

use super::{CommitNode, DEFAULT_BRANCH, FIRST_COMMIT_ID, VersionInfo};
use crate::{DatasetMeta, Info, TensorState};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Current position in the commit graph together with the metadata loaded
/// for it.
///
/// There is one instance per opened dataset shared by all of its views.
/// `branch_commit_map[branch]` always names the current node when the
/// position is a branch head.
#[derive(Debug, Clone)]
pub struct VersionState {
    pub(crate) commit_id: String,
    pub(crate) branch: String,
    pub(crate) info: VersionInfo,
    pub(crate) meta: DatasetMeta,
    pub(crate) dataset_info: Info,
    pub(crate) full_tensors: BTreeMap<String, TensorState>,
}

impl Default for VersionState {
    fn default() -> Self {
        Self::new(VersionInfo::new(), DEFAULT_BRANCH, FIRST_COMMIT_ID)
    }
}

impl VersionState {
    pub fn new(info: VersionInfo, branch: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            commit_id: commit_id.into(),
            branch: branch.into(),
            info,
            meta: DatasetMeta::new(),
            dataset_info: Info::new(),
            full_tensors: BTreeMap::new(),
        }
    }

    /// Positions at the head of the default branch
    pub fn at_default_branch(info: VersionInfo) -> Self {
        let commit_id = info
            .branch_head(DEFAULT_BRANCH)
            .unwrap_or(FIRST_COMMIT_ID)
            .to_string();
        Self::new(info, DEFAULT_BRANCH, commit_id)
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn info(&self) -> &VersionInfo {
        &self.info
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    pub fn dataset_info(&self) -> &Info {
        &self.dataset_info
    }

    pub fn full_tensors(&self) -> &BTreeMap<String, TensorState> {
        &self.full_tensors
    }

    pub fn commit_node(&self) -> Option<&CommitNode> {
        self.info.node(&self.commit_id)
    }

    pub(crate) fn current_node(&self) -> Result<&CommitNode, InternalError> {
        match self.info.node(&self.commit_id) {
            Some(node) => Ok(node),
            None => InternalError::bail(format!(
                "Commit {} is missing from the commit graph",
                self.commit_id
            )),
        }
    }

    pub(crate) fn current_node_mut(&mut self) -> Result<&mut CommitNode, InternalError> {
        match self.info.commit_node_map.get_mut(&self.commit_id) {
            Some(node) => Ok(node),
            None => InternalError::bail(format!(
                "Commit {} is missing from the commit graph",
                self.commit_id
            )),
        }
    }
}
