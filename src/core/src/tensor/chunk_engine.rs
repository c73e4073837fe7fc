// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use bytes::Bytes;
use internal_error::{InternalError, ResultIntoInternal};
use tensorvault_storage::{SetError, StorageProvider};

use super::Chunk;
use crate::{ChunkRecord, TensorMeta, keys};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const CHUNK_ID_LEN: usize = 32;

/// Reads and writes samples of one tensor through its chunks
pub(crate) struct ChunkEngine<'a> {
    storage: &'a dyn StorageProvider,
    tensor: &'a str,
}

impl<'a> ChunkEngine<'a> {
    pub fn new(storage: &'a dyn StorageProvider, tensor: &'a str) -> Self {
        Self { storage, tensor }
    }

    /// Appends samples updating `meta` in place.
    ///
    /// Only the last chunk of the tensor is ever rewritten and only when it
    /// was created by `commit_id`, chunks of finalized commits are never
    /// modified.
    #[tracing::instrument(level = "debug", skip_all, fields(tensor = %self.tensor, num_samples = samples.len()))]
    pub async fn append(
        &self,
        meta: &mut TensorMeta,
        commit_id: &str,
        samples: Vec<Bytes>,
    ) -> Result<(), SetError> {
        let mut open: Option<(usize, Chunk)> = None;

        if let Some(last) = meta.chunks.last()
            && last.commit_id == commit_id
            && last.num_bytes < meta.max_chunk_size
        {
            let chunk = self.read_chunk(&last.chunk_id).await?;
            open = Some((meta.chunks.len() - 1, chunk));
        }

        for sample in samples {
            let fits = open.as_ref().is_some_and(|(_, chunk)| {
                chunk.is_empty() || chunk.num_bytes() + sample.len() as u64 <= meta.max_chunk_size
            });

            if !fits {
                if let Some((idx, chunk)) = open.take() {
                    self.write_chunk(meta, idx, &chunk).await?;
                }

                meta.chunks.push(ChunkRecord {
                    chunk_id: random_strings::get_random_hex(CHUNK_ID_LEN),
                    commit_id: commit_id.to_string(),
                    num_samples: 0,
                    num_bytes: 0,
                });
                open = Some((meta.chunks.len() - 1, Chunk::new()));
            }

            if let Some((_, chunk)) = open.as_mut() {
                chunk.push(sample);
                meta.length += 1;
            }
        }

        if let Some((idx, chunk)) = open {
            self.write_chunk(meta, idx, &chunk).await?;
        }

        Ok(())
    }

    /// Reads samples at the given positions in the given order
    #[tracing::instrument(level = "debug", skip_all, fields(tensor = %self.tensor))]
    pub async fn read(
        &self,
        meta: &TensorMeta,
        positions: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<Bytes>, InternalError> {
        let mut starts = Vec::with_capacity(meta.chunks.len());
        let mut total = 0;
        for record in &meta.chunks {
            starts.push(total);
            total += usize::try_from(record.num_samples).int_err()?;
        }

        let mut current: Option<(usize, Chunk)> = None;
        let mut samples = Vec::new();

        for position in positions {
            if position >= total {
                return InternalError::bail(format!(
                    "Sample {position} is beyond the {total} samples of tensor {}",
                    self.tensor
                ));
            }

            let idx = starts.partition_point(|start| *start <= position) - 1;

            if current.as_ref().is_none_or(|(i, _)| *i != idx) {
                let chunk = self.read_chunk(&meta.chunks[idx].chunk_id).await?;
                current = Some((idx, chunk));
            }

            let sample = current
                .as_ref()
                .and_then(|(_, chunk)| chunk.get(position - starts[idx]))
                .cloned();

            match sample {
                Some(sample) => samples.push(sample),
                None => {
                    return InternalError::bail(format!(
                        "Chunk {} of tensor {} holds fewer samples than recorded",
                        meta.chunks[idx].chunk_id, self.tensor
                    ));
                }
            }
        }

        Ok(samples)
    }

    async fn read_chunk(&self, chunk_id: &str) -> Result<Chunk, InternalError> {
        let key = keys::chunk_key(self.tensor, chunk_id);
        tracing::debug!(%key, "Reading chunk");

        let data = self.storage.get(&key).await.int_err()?;
        Chunk::decode(data)
    }

    async fn write_chunk(
        &self,
        meta: &mut TensorMeta,
        idx: usize,
        chunk: &Chunk,
    ) -> Result<(), SetError> {
        let record = &mut meta.chunks[idx];
        record.num_samples = chunk.len() as u64;
        record.num_bytes = chunk.num_bytes();

        let key = keys::chunk_key(self.tensor, &record.chunk_id);
        tracing::debug!(%key, num_samples = record.num_samples, "Writing chunk");

        self.storage.set(&key, chunk.encode()?).await
    }
}
