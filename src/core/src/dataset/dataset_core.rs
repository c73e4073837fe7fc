// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use internal_error::InternalError;
use tensorvault_storage::{CacheStorage, SetError};
use time_source::SystemTimeSource;
use tokio::sync::{Mutex, MutexGuard};

use crate::namespace::{self, Resolved};
use crate::persistence::write_json;
use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// State shared by all views of one opened dataset
pub(crate) struct DatasetCore {
    pub path: String,
    pub storage: Arc<CacheStorage>,
    pub version_state: Mutex<VersionState>,
    pub config: DatasetConfig,
    pub time_source: Arc<dyn SystemTimeSource>,
    pub reporter: Arc<dyn EventReporter>,
    pub lock: std::sync::Mutex<Option<LockHandle>>,
    pub lock_lost: Arc<AtomicBool>,
    pub lock_loss_reported: AtomicBool,
}

impl DatasetCore {
    pub fn version_control(&self) -> VersionControl<'_> {
        VersionControl::new(self.storage.as_ref(), self.time_source.as_ref())
    }

    pub fn is_read_only(&self) -> bool {
        self.storage.is_read_only()
    }

    /// Warns once after the lock was lost in the background
    pub fn check_lock_state(&self) {
        if self.lock_lost.load(Ordering::SeqCst)
            && !self.lock_loss_reported.swap(true, Ordering::SeqCst)
        {
            tracing::warn!(
                path = %self.path,
                "Dataset lock was lost, the dataset is now in read-only mode"
            );
        }
    }

    /// Takes the version state for a mutation, first moving off a finalized
    /// commit if needed
    async fn begin_write(&self) -> Result<MutexGuard<'_, VersionState>, CheckoutError> {
        self.check_lock_state();
        self.storage.check_read_only()?;

        let mut vs = self.version_state.lock().await;
        self.version_control().auto_checkout(&mut vs, false).await?;
        Ok(vs)
    }

    async fn finish_write(&self, vs: &mut VersionState) -> Result<(), SetError> {
        self.version_control().mark_changed(vs).await?;
        self.storage.maybe_flush().await
    }

    fn report(&self, event: FeatureEvent) {
        reporting::report(self.reporter.as_ref(), event.with("path", self.path.clone()));
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Version control
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub async fn commit(&self, message: Option<&str>) -> Result<String, CommitError> {
        self.check_lock_state();
        self.storage.check_read_only()?;

        let mut vs = self.version_state.lock().await;
        let commit_id = self.version_control().commit(&mut vs, message).await?;
        self.storage.maybe_flush().await?;

        self.report(FeatureEvent::new("commit").with("has_message", message.is_some()));
        Ok(commit_id)
    }

    pub async fn checkout(&self, address: &str, create: bool) -> Result<String, CheckoutError> {
        self.check_lock_state();
        let read_only = self.is_read_only();

        let mut vs = self.version_state.lock().await;
        let commit_id = self
            .version_control()
            .checkout(&mut vs, address, create, read_only)
            .await?;
        if !read_only {
            self.storage.maybe_flush().await?;
        }

        self.report(FeatureEvent::new("checkout").with("create", create));
        Ok(commit_id)
    }

    pub async fn log(&self) -> CommitLog {
        let vs = self.version_state.lock().await;
        self.version_control().log(&vs)
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Namespace
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Resolves a name, reloading metadata of a read-only dataset on a miss
    /// to pick up entries created by the writer
    pub async fn resolve(&self, group_index: &str, name: &str) -> Result<Resolved, InternalError> {
        self.check_lock_state();

        let mut vs = self.version_state.lock().await;
        let resolved = namespace::resolve(&vs.meta, group_index, name);

        if resolved == Resolved::NotFound && self.is_read_only() {
            self.version_control().load_meta(&mut vs).await?;
            return Ok(namespace::resolve(&vs.meta, group_index, name));
        }

        Ok(resolved)
    }

    #[tracing::instrument(level = "info", skip_all, fields(%group_index, %name))]
    pub async fn create_tensor(
        &self,
        group_index: &str,
        name: &str,
        options: TensorOptions,
    ) -> Result<String, CreateTensorError> {
        let mut vs = self.begin_write().await?;

        let name = namespace::normalize(name);
        let full = namespace::join(group_index, &name);
        let new_groups = namespace::check_new_tensor(&vs.meta, &name, &full)?;

        let tensor = TensorState {
            meta: TensorMeta::new(&options, self.config.max_chunk_size),
            info: options.info,
        };
        let mut meta = vs.meta.clone();
        meta.tensors.push(full.clone());
        meta.groups.extend(new_groups);

        let commit_id = vs.commit_id.clone();
        let storage = self.storage.as_ref();
        write_json(storage, &keys::tensor_meta_key(&commit_id, &full), &tensor.meta).await?;
        write_json(storage, &keys::tensor_info_key(&commit_id, &full), &tensor.info).await?;
        write_json(storage, &keys::dataset_meta_key(&commit_id), &meta).await?;

        let htype = tensor.meta.htype.clone();
        vs.meta = meta;
        vs.full_tensors.insert(full.clone(), tensor);
        self.finish_write(&mut vs).await?;

        self.report(FeatureEvent::new("create_tensor").with("htype", htype));
        Ok(full)
    }

    #[tracing::instrument(level = "info", skip_all, fields(%group_index, %name))]
    pub async fn create_group(&self, group_index: &str, name: &str) -> Result<String, CreateGroupError> {
        let mut vs = self.begin_write().await?;

        let name = namespace::normalize(name);
        let full = namespace::join(group_index, &name);
        let new_groups = namespace::check_new_group(&vs.meta, &name, &full)?;

        let mut meta = vs.meta.clone();
        meta.groups.extend(new_groups);

        let commit_id = vs.commit_id.clone();
        write_json(
            self.storage.as_ref(),
            &keys::dataset_meta_key(&commit_id),
            &meta,
        )
        .await?;

        vs.meta = meta;
        self.finish_write(&mut vs).await?;

        self.report(FeatureEvent::new("create_group"));
        Ok(full)
    }

    pub async fn meta(&self) -> DatasetMeta {
        self.version_state.lock().await.meta.clone()
    }

    pub async fn dataset_info(&self) -> Info {
        self.version_state.lock().await.dataset_info.clone()
    }

    pub async fn update_dataset_info(&self, info: Info) -> Result<(), WriteError> {
        let mut vs = self.begin_write().await?;

        let mut merged = vs.dataset_info.clone();
        merged.extend(info);

        let commit_id = vs.commit_id.clone();
        write_json(
            self.storage.as_ref(),
            &keys::dataset_info_key(&commit_id),
            &merged,
        )
        .await?;

        vs.dataset_info = merged;
        self.finish_write(&mut vs).await?;
        Ok(())
    }

    /// Tensor states of all tensors under a group keyed by full path
    pub async fn tensors_under(&self, group_index: &str) -> Vec<(String, TensorState)> {
        let vs = self.version_state.lock().await;
        vs.full_tensors
            .iter()
            .filter(|(full, _)| namespace::relative_to(group_index, full).is_some())
            .map(|(full, state)| (full.clone(), state.clone()))
            .collect()
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Tensors
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub async fn tensor_state(&self, key: &str) -> Result<TensorState, TensorDoesNotExistError> {
        self.version_state
            .lock()
            .await
            .full_tensors
            .get(key)
            .cloned()
            .ok_or_else(|| TensorDoesNotExistError {
                name: key.to_string(),
            })
    }

    pub async fn append(&self, key: &str, samples: Vec<Bytes>) -> Result<(), TensorWriteError> {
        let mut vs = self.begin_write().await?;

        let commit_id = vs.commit_id.clone();
        let Some(state) = vs.full_tensors.get(key) else {
            return Err(TensorDoesNotExistError {
                name: key.to_string(),
            }
            .into());
        };

        let mut meta = state.meta.clone();
        ChunkEngine::new(self.storage.as_ref(), key)
            .append(&mut meta, &commit_id, samples)
            .await?;
        write_json(
            self.storage.as_ref(),
            &keys::tensor_meta_key(&commit_id, key),
            &meta,
        )
        .await?;

        if let Some(state) = vs.full_tensors.get_mut(key) {
            state.meta = meta;
        }
        self.finish_write(&mut vs).await?;
        Ok(())
    }

    pub async fn read(
        &self,
        key: &str,
        positions: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<Bytes>, TensorReadError> {
        self.check_lock_state();

        let state = self.tensor_state(key).await?;
        let samples = ChunkEngine::new(self.storage.as_ref(), key)
            .read(&state.meta, positions)
            .await?;
        Ok(samples)
    }

    pub async fn update_tensor_info(&self, key: &str, info: Info) -> Result<(), TensorWriteError> {
        let mut vs = self.begin_write().await?;

        let Some(state) = vs.full_tensors.get(key) else {
            return Err(TensorDoesNotExistError {
                name: key.to_string(),
            }
            .into());
        };

        let mut merged = state.info.clone();
        merged.extend(info);

        let commit_id = vs.commit_id.clone();
        write_json(
            self.storage.as_ref(),
            &keys::tensor_info_key(&commit_id, key),
            &merged,
        )
        .await?;

        if let Some(state) = vs.full_tensors.get_mut(key) {
            state.info = merged;
        }
        self.finish_write(&mut vs).await?;
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Lock
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn holds_lock(&self) -> bool {
        self.lock.lock().unwrap().is_some()
    }

    pub async fn release_lock(&self) {
        let handle = self.lock.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.release().await;
        }
    }
}
