// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use internal_error::{ErrorIntoInternal, InternalError};
pub use tensorvault_storage::ReadOnlyError;
use tensorvault_storage::{DeleteError, SetError};
use thiserror::Error;

use crate::IndexError;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Tensor already exists: {name}")]
pub struct TensorAlreadyExistsError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Tensor group already exists: {name}")]
pub struct TensorGroupAlreadyExistsError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid tensor name: '{name}'")]
pub struct InvalidTensorNameError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid tensor group name: '{name}'")]
pub struct InvalidTensorGroupNameError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Tensor does not exist: {name}")]
pub struct TensorDoesNotExistError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Neither a branch nor a commit exists with the name: {address}")]
pub struct CheckoutTargetNotFoundError {
    pub address: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Branch or commit already exists: {name}")]
pub struct BranchAlreadyExistsError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid operation: {message}")]
pub struct InvalidOperationError {
    pub message: String,
}

impl InvalidOperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Path is not empty and does not contain a dataset: {path}")]
pub struct PathNotEmptyError {
    pub path: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dataset does not exist and can not be created in read-only mode: {path}")]
pub struct CouldNotCreateNewDatasetError {
    pub path: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("In-memory dataset can not be serialized: {path}")]
pub struct MemoryDatasetCanNotBeSerializedError {
    pub path: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Dataset is approximately {size} bytes which exceeds the safety limit of {limit} bytes, \
     deletion has to be explicitly allowed"
)]
pub struct DatasetTooLargeError {
    pub size: u64,
    pub limit: u64,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Operation errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum OpenDatasetError {
    #[error(transparent)]
    PathNotEmpty(#[from] PathNotEmptyError),
    #[error(transparent)]
    CouldNotCreate(#[from] CouldNotCreateNewDatasetError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error(transparent)]
    NotFound(#[from] CheckoutTargetNotFoundError),
    #[error(transparent)]
    AlreadyExists(#[from] BranchAlreadyExistsError),
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<CommitError> for CheckoutError {
    fn from(value: CommitError) -> Self {
        match value {
            CommitError::ReadOnly(e) => Self::ReadOnly(e),
            CommitError::InvalidOperation(e) => Self::Internal(e.int_err()),
            CommitError::Internal(e) => Self::Internal(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum CreateTensorError {
    #[error(transparent)]
    AlreadyExists(#[from] TensorAlreadyExistsError),
    #[error(transparent)]
    GroupAlreadyExists(#[from] TensorGroupAlreadyExistsError),
    #[error(transparent)]
    InvalidName(#[from] InvalidTensorNameError),
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum CreateGroupError {
    #[error(transparent)]
    TensorAlreadyExists(#[from] TensorAlreadyExistsError),
    #[error(transparent)]
    GroupAlreadyExists(#[from] TensorGroupAlreadyExistsError),
    #[error(transparent)]
    InvalidName(#[from] InvalidTensorGroupNameError),
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum GetEntryError {
    #[error(transparent)]
    NotFound(#[from] TensorDoesNotExistError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum TensorReadError {
    #[error(transparent)]
    NotFound(#[from] TensorDoesNotExistError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum TensorWriteError {
    #[error(transparent)]
    NotFound(#[from] TensorDoesNotExistError),
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Failure of plain writes such as flushing or updating info
#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
pub enum DeleteDatasetError {
    #[error(transparent)]
    TooLarge(#[from] DatasetTooLargeError),
    #[error(transparent)]
    ReadOnly(#[from] ReadOnlyError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Conversions from storage errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

macro_rules! impl_from_storage_write_errors {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<SetError> for $t {
                fn from(value: SetError) -> Self {
                    match value {
                        SetError::Access(tensorvault_storage::AccessError::ReadOnly(e)) => {
                            Self::ReadOnly(e)
                        }
                        SetError::Internal(e) => Self::Internal(e),
                        other => Self::Internal(other.int_err()),
                    }
                }
            }

            impl From<DeleteError> for $t {
                fn from(value: DeleteError) -> Self {
                    match value {
                        DeleteError::Access(tensorvault_storage::AccessError::ReadOnly(e)) => {
                            Self::ReadOnly(e)
                        }
                        DeleteError::Internal(e) => Self::Internal(e),
                        other => Self::Internal(other.int_err()),
                    }
                }
            }
        )+
    };
}

impl_from_storage_write_errors!(
    CommitError,
    CheckoutError,
    CreateTensorError,
    CreateGroupError,
    TensorWriteError,
    WriteError,
    DeleteDatasetError,
);

macro_rules! impl_from_checkout_error {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<CheckoutError> for $t {
                fn from(value: CheckoutError) -> Self {
                    match value {
                        CheckoutError::ReadOnly(e) => Self::ReadOnly(e),
                        CheckoutError::Internal(e) => Self::Internal(e),
                        other => Self::Internal(other.int_err()),
                    }
                }
            }
        )+
    };
}

impl_from_checkout_error!(CreateTensorError, CreateGroupError, TensorWriteError, WriteError);
