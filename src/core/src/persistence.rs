// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use bytes::Bytes;
use internal_error::{ErrorIntoInternal, InternalError, ResultIntoInternal};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tensorvault_storage::{GetError, SetError, StorageProvider};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Reads and parses a JSON object, returning `None` if the key is absent
pub(crate) async fn read_json<T: DeserializeOwned>(
    storage: &dyn StorageProvider,
    key: &str,
) -> Result<Option<T>, InternalError> {
    let data = match storage.get(key).await {
        Ok(data) => data,
        Err(GetError::NotFound(_)) => return Ok(None),
        Err(GetError::Access(e)) => return Err(e.int_err()),
        Err(GetError::Internal(e)) => return Err(e),
    };

    let value =
        serde_json::from_slice(&data).context_int_err(format!("Malformed object at key {key}"))?;

    Ok(Some(value))
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(
    storage: &dyn StorageProvider,
    key: &str,
    value: &T,
) -> Result<(), SetError> {
    let data = serde_json::to_vec(value).int_err()?;
    storage.set(key, Bytes::from(data)).await
}
