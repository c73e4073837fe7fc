// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use internal_error::{BoxedError, InternalError};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Response Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ContainsError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetError {
    #[error(transparent)]
    NotFound(#[from] KeyNotFoundError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<ContainsError> for GetError {
    fn from(v: ContainsError) -> Self {
        match v {
            ContainsError::Access(e) => Self::Access(e),
            ContainsError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<SetError> for GetError {
    fn from(v: SetError) -> Self {
        match v {
            SetError::Access(e) => Self::Access(e),
            SetError::Internal(e) => Self::Internal(e),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum SetError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl SetError {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Access(AccessError::ReadOnly(_)))
    }
}

impl From<ReadOnlyError> for SetError {
    fn from(v: ReadOnlyError) -> Self {
        Self::Access(AccessError::ReadOnly(v))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum DeleteError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<ReadOnlyError> for DeleteError {
    fn from(v: ReadOnlyError) -> Self {
        Self::Access(AccessError::ReadOnly(v))
    }
}

impl From<ListError> for DeleteError {
    fn from(v: ListError) -> Self {
        match v {
            ListError::Access(e) => Self::Access(e),
            ListError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<SetError> for DeleteError {
    fn from(v: SetError) -> Self {
        match v {
            SetError::Access(e) => Self::Access(e),
            SetError::Internal(e) => Self::Internal(e),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ListError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Individual Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum AccessError {
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error("Unauthorized")]
    Unauthorized(#[source] BoxedError),
    #[error("Forbidden")]
    Forbidden(#[source] BoxedError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("Storage is in read-only mode")]
pub struct ReadOnlyError;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Key does not exist: {key}")]
pub struct KeyNotFoundError {
    pub key: String,
}

impl KeyNotFoundError {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}
