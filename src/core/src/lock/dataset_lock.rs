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
use std::time::Duration;

use chrono::{DateTime, Utc};
use internal_error::{InternalError, ResultIntoInternal};
use serde::{Deserialize, Serialize};
use tensorvault_storage::StorageProvider;
use thiserror::Error;
use time_source::SystemTimeSource;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::keys::DATASET_LOCK_KEY;
use crate::persistence::{read_json, write_json};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Invoked at most once when the lock is found to be lost
pub type LockLostCallback = Box<dyn FnOnce() + Send + 'static>;

/// Marker object stored under [`DATASET_LOCK_KEY`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockMarker {
    pub identity: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LockOptions {
    pub update_interval: Duration,
    pub validity: Duration,
}

impl From<&crate::LockConfig> for LockOptions {
    fn from(value: &crate::LockConfig) -> Self {
        Self {
            update_interval: value.update_interval(),
            validity: value.validity(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Advisory write lock of a dataset location shared between processes.
///
/// The holder keeps refreshing a timestamped marker from a background task.
/// A marker that was not refreshed within the validity period is considered
/// abandoned and can be taken over.
pub struct DatasetLock;

impl DatasetLock {
    #[tracing::instrument(level = "debug", skip_all, fields(%identity))]
    pub async fn acquire(
        storage: Arc<dyn StorageProvider>,
        identity: String,
        options: LockOptions,
        time_source: Arc<dyn SystemTimeSource>,
        on_lost: LockLostCallback,
    ) -> Result<LockHandle, AcquireLockError> {
        let validity = chrono::Duration::from_std(options.validity).int_err()?;

        if let Some(marker) = read_marker(storage.as_ref()).await?
            && marker.identity != identity
            && time_source.now() - marker.timestamp < validity
        {
            return Err(LockedError::from(marker).into());
        }

        let marker = LockMarker {
            identity: identity.clone(),
            timestamp: time_source.now(),
        };
        write_json(storage.as_ref(), DATASET_LOCK_KEY, &marker)
            .await
            .int_err()?;

        // Another process may have written its marker concurrently
        match read_marker(storage.as_ref()).await? {
            Some(marker) if marker.identity == identity => {}
            Some(marker) => return Err(LockedError::from(marker).into()),
            None => return Err(InternalError::new("Lock marker vanished after writing").into()),
        }

        tracing::debug!("Acquired dataset lock");

        let cancel = CancellationToken::new();
        let lost = Arc::new(AtomicBool::new(false));

        let monitor = LockMonitor {
            storage: storage.clone(),
            identity: identity.clone(),
            update_interval: options.update_interval,
            validity,
            time_source,
            cancel: cancel.clone(),
            lost: lost.clone(),
        };
        let monitor = tokio::spawn(monitor.run(on_lost));

        Ok(LockHandle {
            storage,
            identity,
            cancel,
            monitor: Some(monitor),
            lost,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Held lock. Dropping the handle stops the monitor but leaves the marker to
/// expire, use [`LockHandle::release`] to remove it.
pub struct LockHandle {
    storage: Arc<dyn StorageProvider>,
    identity: String,
    cancel: CancellationToken,
    monitor: Option<JoinHandle<()>>,
    lost: Arc<AtomicBool>,
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("identity", &self.identity)
            .field("lost", &self.lost)
            .finish_non_exhaustive()
    }
}

impl LockHandle {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Stops the monitor and removes the marker if it is still ours.
    /// Failures are logged and otherwise ignored.
    #[tracing::instrument(level = "debug", skip_all, fields(identity = %self.identity))]
    pub async fn release(mut self) {
        self.cancel.cancel();
        if let Some(monitor) = self.monitor.take()
            && let Err(err) = monitor.await
        {
            tracing::warn!(error = %err, "Lock monitor terminated abnormally");
        }

        match read_marker(self.storage.as_ref()).await {
            Ok(Some(marker)) if marker.identity == self.identity => {
                if let Err(err) = self.storage.delete(DATASET_LOCK_KEY).await {
                    tracing::warn!(error = ?err, "Failed to remove lock marker");
                } else {
                    tracing::debug!("Released dataset lock");
                }
            }
            Ok(marker) => {
                tracing::debug!(
                    holder = ?marker.map(|m| m.identity),
                    "Lock marker is not ours, leaving it in place"
                );
            }
            Err(err) => tracing::warn!(error = ?err, "Failed to read lock marker on release"),
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct LockMonitor {
    storage: Arc<dyn StorageProvider>,
    identity: String,
    update_interval: Duration,
    validity: chrono::Duration,
    time_source: Arc<dyn SystemTimeSource>,
    cancel: CancellationToken,
    lost: Arc<AtomicBool>,
}

impl LockMonitor {
    async fn run(self, on_lost: LockLostCallback) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(self.update_interval) => {}
            }

            match read_marker(self.storage.as_ref()).await {
                Ok(Some(marker))
                    if marker.identity == self.identity
                        && self.time_source.now() - marker.timestamp < self.validity =>
                {
                    self.refresh().await;
                }
                Ok(marker) => {
                    tracing::warn!(
                        identity = %self.identity,
                        holder = ?marker.map(|m| m.identity),
                        "Dataset lock was lost"
                    );
                    self.lost.store(true, Ordering::SeqCst);
                    on_lost();
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = ?err, "Failed to check dataset lock, will retry");
                }
            }
        }
    }

    async fn refresh(&self) {
        let marker = LockMarker {
            identity: self.identity.clone(),
            timestamp: self.time_source.now(),
        };
        match write_json(self.storage.as_ref(), DATASET_LOCK_KEY, &marker).await {
            Ok(()) => tracing::trace!("Refreshed dataset lock"),
            Err(err) => tracing::warn!(error = ?err, "Failed to refresh dataset lock"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

async fn read_marker(storage: &dyn StorageProvider) -> Result<Option<LockMarker>, InternalError> {
    read_json(storage, DATASET_LOCK_KEY).await
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum AcquireLockError {
    #[error(transparent)]
    Locked(#[from] LockedError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dataset is locked by {holder} since {since}")]
pub struct LockedError {
    pub holder: String,
    pub since: DateTime<Utc>,
}

impl From<LockMarker> for LockedError {
    fn from(value: LockMarker) -> Self {
        Self {
            holder: value.identity,
            since: value.timestamp,
        }
    }
}
