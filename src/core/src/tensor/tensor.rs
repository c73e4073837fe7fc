// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// View of one tensor of a dataset through an [`Index`].
///
/// Samples are opaque byte strings. The first axis of the index selects
/// samples, the second one selects bytes within each sample.
#[derive(Clone)]
pub struct Tensor {
    core: Arc<DatasetCore>,
    key: String,
    index: Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorValue {
    /// Read through an index that collapsed the sample axis
    Sample(Bytes),
    Samples(Vec<Bytes>),
}

impl TensorValue {
    pub fn into_vec(self) -> Vec<Bytes> {
        match self {
            Self::Sample(sample) => vec![sample],
            Self::Samples(samples) => samples,
        }
    }
}

impl Tensor {
    pub(crate) fn new(core: Arc<DatasetCore>, key: String, index: Index) -> Self {
        Self { core, key, index }
    }

    /// Full path of the tensor within its dataset
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn select(&self, selector: impl Into<Selector>) -> Result<Self, IndexError> {
        Ok(Self {
            core: self.core.clone(),
            key: self.key.clone(),
            index: self.index.compose(selector)?,
        })
    }

    pub async fn meta(&self) -> Result<TensorMeta, TensorReadError> {
        Ok(self.core.tensor_state(&self.key).await?.meta)
    }

    pub async fn info(&self) -> Result<Info, TensorReadError> {
        Ok(self.core.tensor_state(&self.key).await?.info)
    }

    /// Number of samples stored regardless of the index
    pub async fn num_samples(&self) -> Result<u64, TensorReadError> {
        Ok(self.meta().await?.length)
    }

    /// Number of samples visible through the index
    pub async fn len(&self) -> Result<usize, TensorReadError> {
        let length = usize::try_from(self.num_samples().await?).unwrap_or(usize::MAX);
        Ok(self.index.length(length)?)
    }

    pub async fn is_empty(&self) -> Result<bool, TensorReadError> {
        Ok(self.len().await? == 0)
    }

    pub async fn num_chunks(&self) -> Result<usize, TensorReadError> {
        Ok(self.meta().await?.num_chunks())
    }

    pub async fn min_chunk_size(&self) -> Result<u64, TensorReadError> {
        Ok(self.meta().await?.min_chunk_size())
    }

    pub async fn append(&self, sample: impl Into<Bytes>) -> Result<(), TensorWriteError> {
        self.extend([sample.into()]).await
    }

    pub async fn extend<I, B>(&self, samples: I) -> Result<(), TensorWriteError>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        if !self.index.is_trivial() {
            return Err(InvalidOperationError::new(format!(
                "Can not append to {} through a sub-selection {}",
                self.key, self.index
            ))
            .into());
        }

        let samples: Vec<Bytes> = samples.into_iter().map(Into::into).collect();
        if samples.is_empty() {
            return Ok(());
        }

        self.core.append(&self.key, samples).await
    }

    /// Reads the samples selected by the index
    pub async fn read(&self) -> Result<TensorValue, TensorReadError> {
        if self.index.num_axes() > 2 {
            return Err(IndexError::NotSubscriptable { axis: 2 }.into());
        }

        let length = usize::try_from(self.num_samples().await?).unwrap_or(usize::MAX);
        let positions = self.index.positions(0, length)?;

        let samples = self
            .core
            .read(&self.key, positions.iter().collect::<Vec<_>>())
            .await?
            .into_iter()
            .map(|sample| self.select_bytes(sample))
            .collect::<Result<Vec<_>, _>>()?;

        if self.index.is_scalar() {
            let sample = samples.into_iter().next().unwrap_or_default();
            Ok(TensorValue::Sample(sample))
        } else {
            Ok(TensorValue::Samples(samples))
        }
    }

    /// Merges attributes into the info of the tensor
    pub async fn update_info(&self, info: Info) -> Result<(), TensorWriteError> {
        self.core.update_tensor_info(&self.key, info).await
    }

    fn select_bytes(&self, sample: Bytes) -> Result<Bytes, IndexError> {
        if self.index.axis_entries(1).is_empty() {
            return Ok(sample);
        }

        match self.index.positions(1, sample.len())? {
            Positions::Single(p) => Ok(sample.slice(p..=p)),
            Positions::Range {
                start,
                step: 1,
                len,
            } => Ok(sample.slice(start..start + len)),
            positions => {
                let mut buf = BytesMut::with_capacity(positions.len());
                buf.extend(positions.iter().map(|p| sample[p]));
                Ok(buf.freeze())
            }
        }
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("key", &self.key)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor(key='{}', index={})", self.key, self.index)
    }
}
