// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use super::{FORMAT_VERSION, Info};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_HTYPE: &str = "generic";

/// Persisted description of one tensor at one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TensorMeta {
    pub htype: String,
    pub dtype: Option<String>,
    pub sample_compression: Option<String>,
    pub chunk_compression: Option<String>,
    pub max_chunk_size: u64,
    /// Number of samples
    pub length: u64,
    pub chunks: Vec<ChunkRecord>,
    pub version: String,
}

/// Location of a contiguous run of samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    pub chunk_id: String,
    /// Commit that created the chunk. Only chunks of the current commit can
    /// be rewritten.
    pub commit_id: String,
    pub num_samples: u64,
    pub num_bytes: u64,
}

impl TensorMeta {
    pub fn new(options: &TensorOptions, default_max_chunk_size: u64) -> Self {
        Self {
            htype: options.htype.clone(),
            dtype: options.dtype.clone(),
            sample_compression: options.sample_compression.clone(),
            chunk_compression: options.chunk_compression.clone(),
            max_chunk_size: options.max_chunk_size.unwrap_or(default_max_chunk_size),
            length: 0,
            chunks: Vec::new(),
            version: FORMAT_VERSION.to_string(),
        }
    }

    /// Same configuration without any samples
    pub fn empty_like(&self) -> Self {
        Self {
            length: 0,
            chunks: Vec::new(),
            version: FORMAT_VERSION.to_string(),
            ..self.clone()
        }
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn min_chunk_size(&self) -> u64 {
        self.max_chunk_size / 2
    }

    /// Approximate number of bytes occupied by chunks
    pub fn size_approx(&self) -> u64 {
        self.num_chunks() as u64 * self.min_chunk_size()
    }

    pub fn to_options(&self) -> TensorOptions {
        TensorOptions {
            htype: self.htype.clone(),
            dtype: self.dtype.clone(),
            sample_compression: self.sample_compression.clone(),
            chunk_compression: self.chunk_compression.clone(),
            max_chunk_size: Some(self.max_chunk_size),
            info: Info::new(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Parameters of a newly created tensor
#[derive(Debug, Clone, PartialEq)]
pub struct TensorOptions {
    pub htype: String,
    pub dtype: Option<String>,
    pub sample_compression: Option<String>,
    pub chunk_compression: Option<String>,
    /// Falls back to the dataset config when not set
    pub max_chunk_size: Option<u64>,
    pub info: Info,
}

impl Default for TensorOptions {
    fn default() -> Self {
        Self {
            htype: DEFAULT_HTYPE.to_string(),
            dtype: None,
            sample_compression: None,
            chunk_compression: None,
            max_chunk_size: None,
            info: Info::new(),
        }
    }
}

impl TensorOptions {
    pub fn new(htype: impl Into<String>) -> Self {
        Self {
            htype: htype.into(),
            ..Self::default()
        }
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }

    pub fn with_sample_compression(mut self, compression: impl Into<String>) -> Self {
        self.sample_compression = Some(compression.into());
        self
    }

    pub fn with_chunk_compression(mut self, compression: impl Into<String>) -> Self {
        self.chunk_compression = Some(compression.into());
        self
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: u64) -> Self {
        self.max_chunk_size = Some(max_chunk_size);
        self
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// In-memory state of a tensor at the current commit
#[derive(Debug, Clone, PartialEq)]
pub struct TensorState {
    pub meta: TensorMeta,
    pub info: Info,
}
