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
use std::sync::atomic::Ordering;

use internal_error::InternalError;
use tensorvault_storage::{CacheStorage, StorageProvider};

use crate::namespace::{self, Resolved};
use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// View of a dataset: the whole dataset or one of its groups, seen through an
/// [`Index`] over samples.
///
/// Views are cheap to clone and all views of one opened dataset share its
/// version state, cache and lock.
#[derive(Clone)]
pub struct Dataset {
    core: Arc<DatasetCore>,
    index: Index,
    group_index: String,
}

/// Result of resolving a name within a dataset view
#[derive(Debug, Clone)]
pub enum Lookup {
    Tensor(Tensor),
    Group(Dataset),
    NotFound,
}

#[derive(Debug, Clone)]
pub enum DatasetEntry {
    Tensor(Tensor),
    Group(Dataset),
}

impl Dataset {
    pub(crate) fn new(core: Arc<DatasetCore>, index: Index, group_index: String) -> Self {
        Self {
            core,
            index,
            group_index,
        }
    }

    /// Opens the dataset at the given location, creating an empty one if the
    /// location is empty
    pub async fn open(
        storage: Arc<dyn StorageProvider>,
        options: DatasetOpenOptions,
    ) -> Result<Self, OpenDatasetError> {
        let core = open_core(storage, options, None).await?;
        Ok(Self::new(core, Index::new(), String::new()))
    }

    /// Same as [`Dataset::open`] picking the storage provider by path
    pub async fn open_path(
        path: &str,
        options: DatasetOpenOptions,
    ) -> Result<Self, OpenDatasetError> {
        let storage = storage_provider_from_path(path).await?;
        Self::open(storage, options).await
    }

    pub fn path(&self) -> &str {
        &self.core.path
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Path of the group this view is rooted at, empty for the whole dataset
    pub fn group_index(&self) -> &str {
        &self.group_index
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.core.storage
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.core.config
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Mode
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn read_only(&self) -> bool {
        self.core.is_read_only()
    }

    /// Switches the mode of all views of the dataset. Leaving read-only mode
    /// does not re-acquire a lost lock.
    pub fn set_read_only(&self, read_only: bool) {
        if read_only {
            self.core.storage.enable_readonly();
        } else {
            if self.lock_lost() {
                tracing::warn!(path = %self.core.path, "Leaving read-only mode after the dataset lock was lost");
            }
            self.core.storage.disable_readonly();
        }
    }

    /// True once the background monitor detected that another writer took
    /// over the dataset
    pub fn lock_lost(&self) -> bool {
        self.core.lock_lost.load(Ordering::SeqCst)
    }

    pub fn holds_lock(&self) -> bool {
        self.core.holds_lock()
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Version control
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub async fn commit_id(&self) -> String {
        self.core.version_state.lock().await.commit_id.clone()
    }

    pub async fn branch(&self) -> String {
        self.core.version_state.lock().await.branch.clone()
    }

    pub async fn commit_node(&self) -> Option<CommitNode> {
        self.core
            .version_state
            .lock()
            .await
            .commit_node()
            .cloned()
    }

    /// Snapshot of the commit graph
    pub async fn version_info(&self) -> VersionInfo {
        self.core.version_state.lock().await.info.clone()
    }

    pub async fn branches(&self) -> Vec<String> {
        self.core
            .version_state
            .lock()
            .await
            .info
            .branch_commit_map
            .keys()
            .cloned()
            .collect()
    }

    /// Finalizes pending changes returning the id of the new commit
    pub async fn commit(&self, message: Option<&str>) -> Result<String, CommitError> {
        self.core.commit(message).await
    }

    /// Moves all views of the dataset to a branch or a commit. With `create`
    /// forks a new branch from the current state.
    pub async fn checkout(&self, address: &str, create: bool) -> Result<String, CheckoutError> {
        self.core.checkout(address, create).await
    }

    pub async fn log(&self) -> CommitLog {
        self.core.log().await
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Namespace
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub async fn lookup(&self, name: &str) -> Result<Lookup, InternalError> {
        Ok(match self.core.resolve(&self.group_index, name).await? {
            Resolved::Tensor(key) => Lookup::Tensor(self.tensor_view(key)),
            Resolved::Group(group) => Lookup::Group(self.group_view(group)),
            Resolved::NotFound => Lookup::NotFound,
        })
    }

    pub async fn get(&self, name: &str) -> Result<DatasetEntry, GetEntryError> {
        match self.lookup(name).await? {
            Lookup::Tensor(tensor) => Ok(DatasetEntry::Tensor(tensor)),
            Lookup::Group(group) => Ok(DatasetEntry::Group(group)),
            Lookup::NotFound => Err(self.not_found(name).into()),
        }
    }

    pub async fn tensor(&self, name: &str) -> Result<Tensor, GetEntryError> {
        match self.lookup(name).await? {
            Lookup::Tensor(tensor) => Ok(tensor),
            _ => Err(self.not_found(name).into()),
        }
    }

    pub async fn group(&self, name: &str) -> Result<Self, GetEntryError> {
        match self.lookup(name).await? {
            Lookup::Group(group) => Ok(group),
            _ => Err(self.not_found(name).into()),
        }
    }

    pub async fn create_tensor(
        &self,
        name: &str,
        options: TensorOptions,
    ) -> Result<Tensor, CreateTensorError> {
        let key = self
            .core
            .create_tensor(&self.group_index, name, options)
            .await?;
        Ok(self.tensor_view(key))
    }

    /// Creates an empty tensor with the configuration and info of `source`
    pub async fn create_tensor_like(
        &self,
        name: &str,
        source: &Tensor,
    ) -> Result<Tensor, CreateTensorError> {
        let state = self
            .core
            .tensor_state(source.key())
            .await
            .map_err(|e| CreateTensorError::Internal(InternalError::new(e)))?;

        let options = state.meta.to_options().with_info(state.info);
        self.create_tensor(name, options).await
    }

    pub async fn create_group(&self, name: &str) -> Result<Self, CreateGroupError> {
        let group = self.core.create_group(&self.group_index, name).await?;
        Ok(self.group_view(group))
    }

    /// All tensors under this group, nested ones included, keyed by path
    /// relative to the group
    pub async fn tensors(&self) -> BTreeMap<String, Tensor> {
        self.core
            .tensors_under(&self.group_index)
            .await
            .into_iter()
            .filter_map(|(full, _)| {
                let relative = namespace::relative_to(&self.group_index, &full)?.to_string();
                Some((relative, self.tensor_view(full)))
            })
            .collect()
    }

    /// Direct child groups keyed by name
    pub async fn groups(&self) -> BTreeMap<String, Self> {
        self.core
            .meta()
            .await
            .groups
            .into_iter()
            .filter_map(|full| {
                let relative = namespace::relative_to(&self.group_index, &full)?;
                if relative.is_empty() || relative.contains(namespace::SEPARATOR) {
                    return None;
                }
                let relative = relative.to_string();
                Some((relative, self.group_view(full)))
            })
            .collect()
    }

    pub async fn meta(&self) -> DatasetMeta {
        self.core.meta().await
    }

    pub async fn info(&self) -> Info {
        self.core.dataset_info().await
    }

    /// Merges attributes into the info of the dataset
    pub async fn update_info(&self, info: Info) -> Result<(), WriteError> {
        self.core.update_dataset_info(info).await
    }

    pub fn root(&self) -> Self {
        Self::new(self.core.clone(), self.index.clone(), String::new())
    }

    /// Enclosing group, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.group_index.is_empty() {
            return None;
        }
        let parent = namespace::parent(&self.group_index).to_string();
        Some(Self::new(self.core.clone(), self.index.clone(), parent))
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Samples
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn select(&self, selector: impl Into<Selector>) -> Result<Self, IndexError> {
        Ok(Self::new(
            self.core.clone(),
            self.index.compose(selector)?,
            self.group_index.clone(),
        ))
    }

    /// Length of the shortest tensor under this group regardless of the
    /// index
    pub async fn num_samples(&self) -> u64 {
        self.core
            .tensors_under(&self.group_index)
            .await
            .iter()
            .map(|(_, state)| state.meta.length)
            .min()
            .unwrap_or(0)
    }

    /// Number of samples visible through the index
    pub async fn len(&self) -> Result<usize, IndexError> {
        let num_samples = usize::try_from(self.num_samples().await).unwrap_or(usize::MAX);
        self.index.length(num_samples)
    }

    pub async fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len().await? == 0)
    }

    /// Views of individual samples
    pub async fn iter(&self) -> Result<DatasetIter, IndexError> {
        let len = if self.index.is_scalar() {
            0
        } else {
            self.len().await?
        };

        Ok(DatasetIter {
            dataset: self.clone(),
            next: 0,
            len,
        })
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    // Storage
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub async fn flush(&self) -> Result<(), WriteError> {
        self.core.check_lock_state();
        self.core.storage.flush().await?;
        Ok(())
    }

    /// Flushes and drops the memory tier of the cache
    pub async fn clear_cache(&self) -> Result<(), WriteError> {
        self.core.check_lock_state();
        self.core.storage.clear_cache().await?;
        Ok(())
    }

    /// Defers writes to the base storage until [`Dataset::end_batch`]
    pub fn begin_batch(&self) {
        self.core.storage.set_autoflush(false);
    }

    pub async fn end_batch(&self) -> Result<(), WriteError> {
        self.core.storage.set_autoflush(true);
        self.flush().await
    }

    /// Approximate size of chunk data under this group in bytes
    pub async fn size_approx(&self) -> u64 {
        self.core
            .tensors_under(&self.group_index)
            .await
            .iter()
            .map(|(_, state)| state.meta.size_approx())
            .sum()
    }

    /// Irreversibly removes the whole dataset from its storage and releases
    /// the lock
    #[tracing::instrument(level = "info", skip_all, fields(path = %self.core.path, large_ok))]
    pub async fn delete(&self, large_ok: bool) -> Result<(), DeleteDatasetError> {
        self.core.check_lock_state();

        if !large_ok {
            let size = self.root().size_approx().await;
            let limit = self.core.config.delete_safety_size;
            if size > limit {
                return Err(DatasetTooLargeError { size, limit }.into());
            }
        }

        self.core.storage.check_read_only()?;
        self.core.release_lock().await;
        self.core.storage.clear().await?;

        tracing::info!("Deleted dataset");
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

    fn tensor_view(&self, key: String) -> Tensor {
        Tensor::new(self.core.clone(), key, self.index.clone())
    }

    fn group_view(&self, group: String) -> Self {
        Self::new(self.core.clone(), self.index.clone(), group)
    }

    fn not_found(&self, name: &str) -> TensorDoesNotExistError {
        TensorDoesNotExistError {
            name: namespace::join(&self.group_index, &namespace::normalize(name)),
        }
    }

    pub(crate) fn core(&self) -> &Arc<DatasetCore> {
        &self.core
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.core.path)
            .field("index", &self.index)
            .field("group_index", &self.group_index)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Dataset(path='{}', read_only={}, index={}, group_index='{}')",
            self.core.path,
            self.read_only(),
            self.index,
            self.group_index
        )
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Iterates single-sample views of a dataset
pub struct DatasetIter {
    dataset: Dataset,
    next: usize,
    len: usize,
}

impl Iterator for DatasetIter {
    type Item = Dataset;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let i = self.next;
        self.next += 1;
        self.dataset.select(i).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DatasetIter {}
