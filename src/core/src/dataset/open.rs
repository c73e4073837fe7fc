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

use internal_error::ResultIntoInternal;
use tensorvault_storage::{CacheStorage, StorageProvider};
use time_source::{SystemTimeSource, SystemTimeSourceDefault};
use tokio::sync::Mutex;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone)]
pub struct DatasetOpenOptions {
    pub read_only: bool,
    pub config: DatasetConfig,
    /// Identity recorded in the lock marker, generated when not set
    pub lock_identity: Option<String>,
    pub time_source: Arc<dyn SystemTimeSource>,
    pub reporter: Arc<dyn EventReporter>,
}

impl Default for DatasetOpenOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            config: DatasetConfig::default(),
            lock_identity: None,
            time_source: Arc::new(SystemTimeSourceDefault),
            reporter: Arc::new(EventReporterNoop),
        }
    }
}

impl DatasetOpenOptions {
    pub fn read_only() -> Self {
        Self::default().with_read_only(true)
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_config(mut self, config: DatasetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lock_identity(mut self, identity: impl Into<String>) -> Self {
        self.lock_identity = Some(identity.into());
        self
    }

    pub fn with_time_source(mut self, time_source: Arc<dyn SystemTimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn EventReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

fn generate_lock_identity() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        random_strings::get_random_name(None, 12)
    )
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Opens a dataset location.
///
/// Writers of remote locations take the dataset lock first. Failing to take
/// it is not an error: the dataset is opened read-only instead. With
/// `position` set the version state is positioned there instead of at the
/// head of the default branch.
#[tracing::instrument(level = "info", skip_all, fields(path = %base.protocol()))]
pub(crate) async fn open_core(
    base: Arc<dyn StorageProvider>,
    options: DatasetOpenOptions,
    position: Option<VersionState>,
) -> Result<Arc<DatasetCore>, OpenDatasetError> {
    let protocol = base.protocol();
    let path = protocol.path();
    let storage = Arc::new(CacheStorage::new(
        base.clone(),
        options.config.memory_cache_size,
    ));
    let lock_lost = Arc::new(AtomicBool::new(false));

    let mut read_only = options.read_only;
    let mut lock = None;

    if !read_only && protocol.is_remote() && options.config.lock.enabled {
        let identity = options
            .lock_identity
            .clone()
            .unwrap_or_else(generate_lock_identity);

        let on_lost: LockLostCallback = {
            let read_only_switch = storage.read_only_switch();
            let lock_lost = lock_lost.clone();
            Box::new(move || {
                read_only_switch.enable();
                lock_lost.store(true, Ordering::SeqCst);
            })
        };

        match DatasetLock::acquire(
            base.clone(),
            identity,
            LockOptions::from(&options.config.lock),
            options.time_source.clone(),
            on_lost,
        )
        .await
        {
            Ok(handle) => lock = Some(handle),
            Err(err) => {
                tracing::warn!(
                    %path,
                    error = %err,
                    "Could not acquire the dataset lock, opening in read-only mode"
                );
                read_only = true;
            }
        }
    }

    if read_only {
        storage.enable_readonly();
    }

    let version_state = match load_version_state(
        storage.as_ref(),
        options.time_source.as_ref(),
        &path,
        read_only,
        position,
    )
    .await
    {
        Ok(version_state) => version_state,
        Err(err) => {
            if let Some(lock) = lock {
                lock.release().await;
            }
            return Err(err);
        }
    };

    Ok(Arc::new(DatasetCore {
        path,
        storage,
        version_state: Mutex::new(version_state),
        config: options.config,
        time_source: options.time_source,
        reporter: options.reporter,
        lock: std::sync::Mutex::new(lock),
        lock_lost,
        lock_loss_reported: AtomicBool::new(false),
    }))
}

async fn load_version_state(
    storage: &CacheStorage,
    time_source: &dyn SystemTimeSource,
    path: &str,
    read_only: bool,
    position: Option<VersionState>,
) -> Result<VersionState, OpenDatasetError> {
    let vc = VersionControl::new(storage, time_source);

    if vc.dataset_exists().await? {
        let mut version_state = match position {
            Some(position) => position,
            None => VersionState::at_default_branch(vc.load_version_info().await?),
        };
        vc.load_meta(&mut version_state).await?;

        tracing::debug!(
            commit_id = %version_state.commit_id,
            branch = %version_state.branch,
            "Loaded existing dataset"
        );
        return Ok(version_state);
    }

    let existing = storage.list_keys().await.int_err()?;
    if existing.iter().any(|key| key != keys::DATASET_LOCK_KEY) {
        return Err(PathNotEmptyError {
            path: path.to_string(),
        }
        .into());
    }

    if read_only {
        return Err(CouldNotCreateNewDatasetError {
            path: path.to_string(),
        }
        .into());
    }

    let version_state = VersionState::default();
    vc.initialize(&version_state).await.int_err()?;
    storage.flush().await.int_err()?;

    tracing::info!(%path, "Created new dataset");
    Ok(version_state)
}
