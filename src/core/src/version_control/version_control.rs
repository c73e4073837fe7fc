// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use internal_error::{InternalError, ResultIntoInternal};
use tensorvault_storage::{SetError, StorageProvider};
use time_source::SystemTimeSource;

use super::*;
use crate::persistence::{read_json, write_json};
use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations over the commit graph of a dataset.
///
/// Operates on an externally owned [`VersionState`] which callers must hold
/// exclusively for the duration of a call.
pub struct VersionControl<'a> {
    storage: &'a dyn StorageProvider,
    time_source: &'a dyn SystemTimeSource,
}

impl<'a> VersionControl<'a> {
    pub fn new(storage: &'a dyn StorageProvider, time_source: &'a dyn SystemTimeSource) -> Self {
        Self {
            storage,
            time_source,
        }
    }

    /// A location holds a dataset iff the commit graph has been persisted
    pub async fn dataset_exists(&self) -> Result<bool, InternalError> {
        self.storage
            .contains(keys::VERSION_CONTROL_INFO_KEY)
            .await
            .int_err()
    }

    /// Loads the persisted commit graph or starts a new one
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn load_version_info(&self) -> Result<VersionInfo, InternalError> {
        let info: Option<VersionInfo> =
            read_json(self.storage, keys::VERSION_CONTROL_INFO_KEY).await?;
        Ok(info.unwrap_or_default())
    }

    pub async fn save_version_info(&self, state: &VersionState) -> Result<(), SetError> {
        write_json(self.storage, keys::VERSION_CONTROL_INFO_KEY, &state.info).await
    }

    /// Replaces the in-memory metadata with the one persisted for the
    /// current commit
    #[tracing::instrument(level = "debug", skip_all, fields(commit_id = %state.commit_id))]
    pub async fn load_meta(&self, state: &mut VersionState) -> Result<(), InternalError> {
        let commit_id = state.commit_id.clone();

        let meta: DatasetMeta = read_json(self.storage, &keys::dataset_meta_key(&commit_id))
            .await?
            .unwrap_or_default();
        let dataset_info: Info = read_json(self.storage, &keys::dataset_info_key(&commit_id))
            .await?
            .unwrap_or_default();

        let mut full_tensors = BTreeMap::new();
        for name in &meta.tensors {
            let Some(tensor_meta) =
                read_json::<TensorMeta>(self.storage, &keys::tensor_meta_key(&commit_id, name))
                    .await?
            else {
                return InternalError::bail(format!(
                    "Metadata of tensor {name} is missing at commit {commit_id}"
                ));
            };
            let info: Info = read_json(self.storage, &keys::tensor_info_key(&commit_id, name))
                .await?
                .unwrap_or_default();

            full_tensors.insert(
                name.clone(),
                TensorState {
                    meta: tensor_meta,
                    info,
                },
            );
        }

        state.meta = meta;
        state.dataset_info = dataset_info;
        state.full_tensors = full_tensors;
        Ok(())
    }

    /// Writes the complete in-memory metadata under the given commit
    pub async fn write_meta_snapshot(
        &self,
        state: &VersionState,
        commit_id: &str,
    ) -> Result<(), SetError> {
        write_json(self.storage, &keys::dataset_meta_key(commit_id), &state.meta).await?;
        write_json(
            self.storage,
            &keys::dataset_info_key(commit_id),
            &state.dataset_info,
        )
        .await?;

        for (name, tensor) in &state.full_tensors {
            write_json(
                self.storage,
                &keys::tensor_meta_key(commit_id, name),
                &tensor.meta,
            )
            .await?;
            write_json(
                self.storage,
                &keys::tensor_info_key(commit_id, name),
                &tensor.info,
            )
            .await?;
        }

        Ok(())
    }

    /// Persists a fresh dataset at the current position
    pub async fn initialize(&self, state: &VersionState) -> Result<(), SetError> {
        self.write_meta_snapshot(state, &state.commit_id).await?;
        self.save_version_info(state).await
    }

    /// Records that the current node diverged from its parent
    pub async fn mark_changed(&self, state: &mut VersionState) -> Result<(), SetError> {
        if state.current_node()?.has_changes {
            return Ok(());
        }

        let mut next = state.clone();
        next.current_node_mut()?.has_changes = true;
        self.save_version_info(&next).await?;
        *state = next;
        Ok(())
    }

    /// Finalizes the current node and moves to a fresh head of the same
    /// branch. Returns the id of the finalized commit.
    #[tracing::instrument(level = "info", skip_all, fields(branch = %state.branch))]
    pub async fn commit(
        &self,
        state: &mut VersionState,
        message: Option<&str>,
    ) -> Result<String, CommitError> {
        let node = state.current_node()?;
        if node.is_committed() {
            return Err(InvalidOperationError::new(format!(
                "Commit {} is already finalized, checkout a branch to make new commits",
                node.commit_id
            ))
            .into());
        }
        if !node.has_changes {
            return Err(InvalidOperationError::new("There are no changes to commit").into());
        }

        let finalized_id = state.commit_id.clone();
        let now = self.time_source.now();

        // Applied to the caller's state only once everything is persisted
        let mut next = state.clone();
        let node = next.current_node_mut()?;
        node.commit_time = Some(now);
        node.message = message.map(ToString::to_string);

        let new_id = next.info.add_child(&finalized_id, &state.branch);
        next.commit_id.clone_from(&new_id);

        self.write_meta_snapshot(&next, &new_id).await?;
        self.save_version_info(&next).await?;
        *state = next;

        tracing::info!(commit_id = %finalized_id, "Committed");

        Ok(finalized_id)
    }

    /// Moves to a branch or a commit, or forks a new branch with `create`.
    ///
    /// Uncommitted changes of the current head are committed first so that
    /// they are never lost by moving away.
    #[tracing::instrument(level = "info", skip_all, fields(%address, create))]
    pub async fn checkout(
        &self,
        state: &mut VersionState,
        address: &str,
        create: bool,
        read_only: bool,
    ) -> Result<String, CheckoutError> {
        let is_branch = state.info.branch_commit_map.contains_key(address);
        let is_commit = state.info.commit_node_map.contains_key(address);

        if create {
            if is_branch || is_commit {
                return Err(BranchAlreadyExistsError {
                    name: address.to_string(),
                }
                .into());
            }
            if read_only {
                return Err(ReadOnlyError.into());
            }

            let fork_point = self.commit_before_fork(state, address).await?;

            let mut next = state.clone();
            let new_id = next.info.add_child(&fork_point, address);
            next.commit_id.clone_from(&new_id);
            next.branch = address.to_string();

            self.write_meta_snapshot(&next, &new_id).await?;
            self.save_version_info(&next).await?;
            *state = next;

            tracing::info!(%fork_point, commit_id = %new_id, "Created branch");

            return Ok(new_id);
        }

        if !is_branch && !is_commit {
            return Err(CheckoutTargetNotFoundError {
                address: address.to_string(),
            }
            .into());
        }

        if !read_only && self.has_uncommitted_changes(state)? {
            self.commit(state, Some(&format!("auto commit before checkout to {address}")))
                .await?;
        }

        let mut next = state.clone();
        if let Some(head) = state.info.branch_head(address) {
            next.commit_id = head.to_string();
            next.branch = address.to_string();
        } else {
            let node = state
                .info
                .node(address)
                .ok_or_else(|| CheckoutTargetNotFoundError {
                    address: address.to_string(),
                })?;
            next.branch.clone_from(&node.branch);
            next.commit_id = address.to_string();
        }

        self.load_meta(&mut next).await?;
        *state = next;

        Ok(state.commit_id.clone())
    }

    /// Before a mutation at a committed node, forks an `auto_` branch so that
    /// history is never rewritten. Returns `true` if a branch was created.
    pub async fn auto_checkout(
        &self,
        state: &mut VersionState,
        read_only: bool,
    ) -> Result<bool, CheckoutError> {
        if !state.current_node()?.is_committed() {
            return Ok(false);
        }

        let branch = generate_auto_branch_name();
        tracing::info!(
            from = %state.commit_id,
            %branch,
            "Automatically checking out a new branch to modify a past commit"
        );

        self.checkout(state, &branch, true, read_only).await?;
        Ok(true)
    }

    /// Commits in ancestor order starting at the current position, skipping
    /// the uncommitted head
    pub fn log(&self, state: &VersionState) -> CommitLog {
        CommitLog::new(state.info.commit_node_map.clone(), &state.commit_id)
    }

    fn has_uncommitted_changes(&self, state: &VersionState) -> Result<bool, InternalError> {
        let node = state.current_node()?;
        Ok(!node.is_committed() && node.has_changes)
    }

    /// Resolves the commit a new branch starts from, committing pending
    /// changes first
    async fn commit_before_fork(
        &self,
        state: &mut VersionState,
        address: &str,
    ) -> Result<String, CheckoutError> {
        let node = state.current_node()?;

        if node.is_committed() {
            return Ok(node.commit_id.clone());
        }

        if node.has_changes {
            return self
                .commit(state, Some(&format!("auto commit before checkout to {address}")))
                .await
                .map_err(Into::into);
        }

        // An unchanged head holds exactly the state of its parent
        Ok(node.parent.clone().unwrap_or_else(|| node.commit_id.clone()))
    }
}
